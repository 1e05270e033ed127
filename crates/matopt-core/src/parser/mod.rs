//! Low-level tokenizer and brace-block parser for material scripts.
//!
//! The language is whitespace/newline-insensitive with `//` line comments,
//! balanced `/* */` block comments, and `key { nested }` brace blocks.
//! This module only deals with the raw text; material semantics live in
//! `models` and `database`.

#[cfg(test)]
mod tests;

use crate::error::ParseError;

/// Cursor over raw material script text.
pub struct Parser<'a> {
    text: &'a str,
    index: usize,
}

impl<'a> Parser<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, index: 0 }
    }

    /// Current byte offset into the source text.
    pub fn index(&self) -> usize {
        self.index
    }

    /// True while there is unread input left.
    pub fn ok(&self) -> bool {
        self.index < self.text.len()
    }

    fn bytes(&self) -> &'a [u8] {
        self.text.as_bytes()
    }

    /// Peek at the byte `offset` positions ahead of the cursor.
    pub fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes().get(self.index + offset).copied()
    }

    /// Move the cursor back by `count` bytes (used to rewind a brace glued
    /// onto the end of a token).
    pub fn unread(&mut self, count: usize) {
        self.index = self.index.saturating_sub(count);
    }

    /// Advance past any whitespace.
    pub fn skip_spaces(&mut self) {
        while let Some(c) = self.peek(0) {
            if !c.is_ascii_whitespace() {
                break;
            }
            self.index += 1;
        }
    }

    /// Read the next whitespace-delimited token, or `None` at end of input.
    ///
    /// Comments are not interpreted here: a token may start with `//` or
    /// `/*` and it is the caller's job to skip them (see `read_to_eol` and
    /// `skip_comment`).
    pub fn read_token(&mut self) -> Option<&'a str> {
        self.skip_spaces();
        if !self.ok() {
            return None;
        }
        let start = self.index;
        while let Some(c) = self.peek(0) {
            if c.is_ascii_whitespace() {
                break;
            }
            self.index += 1;
        }
        Some(&self.text[start..self.index])
    }

    /// Skip the remainder of the current line (after a `//` comment marker).
    pub fn read_to_eol(&mut self) {
        while let Some(c) = self.peek(0) {
            self.index += 1;
            if c == b'\n' {
                break;
            }
        }
    }

    /// Skip a block comment. The cursor must be positioned just after the
    /// opening `/*`; nested `/* */` pairs are balanced.
    pub fn skip_comment(&mut self) -> Result<(), ParseError> {
        let opened_at = self.index.saturating_sub(2);
        let mut depth = 1usize;
        while self.ok() {
            match (self.peek(0), self.peek(1)) {
                (Some(b'/'), Some(b'*')) => {
                    depth += 1;
                    self.index += 2;
                }
                (Some(b'*'), Some(b'/')) => {
                    depth -= 1;
                    self.index += 2;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => self.index += 1,
            }
        }
        Err(ParseError::UnterminatedComment(opened_at))
    }

    /// True when the cursor sits on a block comment opener.
    pub fn at_block_comment(&self) -> bool {
        self.peek(0) == Some(b'/') && self.peek(1) == Some(b'*')
    }

    /// True when the cursor sits on a line comment opener.
    pub fn at_line_comment(&self) -> bool {
        self.peek(0) == Some(b'/') && self.peek(1) == Some(b'/')
    }

    /// Read a balanced `{ ... }` block, returned inclusive of the outer
    /// braces. Comments between the cursor and the opening brace are
    /// skipped first (some scripts carry a comment between a material name
    /// and its block).
    pub fn read_block(&mut self) -> Result<&'a str, ParseError> {
        loop {
            self.skip_spaces();
            if self.at_line_comment() {
                self.read_to_eol();
            } else if self.at_block_comment() {
                self.index += 2;
                self.skip_comment()?;
            } else {
                break;
            }
        }

        if self.peek(0) != Some(b'{') {
            return Err(ParseError::MissingBlock(self.index));
        }

        let start = self.index;
        let mut depth = 0usize;
        while let Some(c) = self.peek(0) {
            self.index += 1;
            match c {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(&self.text[start..self.index]);
                    }
                }
                _ => {}
            }
        }
        Err(ParseError::UnterminatedBlock(start))
    }

    /// Skip a balanced block without keeping it (unknown nested declarations).
    pub fn skip_block(&mut self) -> Result<(), ParseError> {
        self.read_block().map(|_| ())
    }
}
