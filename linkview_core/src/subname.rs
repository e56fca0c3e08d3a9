// Copyright 2026 the Linkview Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Symbolic sub-object names.
//!
//! A sub-name is a dotted path of object names optionally followed by a leaf
//! element: `"Body.Pad.Face3"`. Object segments keep their trailing `.`; the
//! leaf has none. A segment starting with `;` is a mapped element name and
//! extends to the end of the string, dots included.

use crate::object::{LinkedObjectSource, ObjectId};

/// Prefix marking a mapped (topologically named) element.
pub const MAPPED_ELEMENT_PREFIX: char = ';';

/// Whether `name` is a mapped element name.
#[must_use]
pub fn is_mapped_element(name: &str) -> bool {
    name.starts_with(MAPPED_ELEMENT_PREFIX)
}

/// Splits a sub-name into its sub-object path and leaf element.
///
/// The element starts at the left-most segment beginning with
/// [`MAPPED_ELEMENT_PREFIX`], otherwise after the last `.`. The path keeps
/// its trailing dot.
///
/// ```
/// use linkview_core::subname::split_element;
///
/// assert_eq!(split_element("Body.Pad.Face1"), ("Body.Pad.", "Face1"));
/// assert_eq!(split_element("Body."), ("Body.", ""));
/// assert_eq!(split_element("Face1"), ("", "Face1"));
/// assert_eq!(split_element("Body.;g1.e2"), ("Body.", ";g1.e2"));
/// ```
#[must_use]
pub fn split_element(sub: &str) -> (&str, &str) {
    if is_mapped_element(sub) {
        return ("", sub);
    }
    if let Some(pos) = sub.find(".;") {
        return sub.split_at(pos + 1);
    }
    match sub.rfind('.') {
        Some(dot) => sub.split_at(dot + 1),
        None => ("", sub),
    }
}

/// Parses a leading array index: `"3.Face1"` gives `(3, "Face1")`.
///
/// The digits must be followed by `.` or the end of the string.
#[must_use]
pub fn array_index(sub: &str) -> Option<(usize, &str)> {
    let digits = sub.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let index = sub[..digits].parse().ok()?;
    let rest = &sub[digits..];
    if rest.is_empty() {
        Some((index, rest))
    } else {
        rest.strip_prefix('.').map(|r| (index, r))
    }
}

/// Strips `name` and its dot from the front of `sub`.
///
/// Returns `None` unless `sub` is exactly `name` or starts with `name.`.
#[must_use]
pub fn check_subname<'a>(name: &str, sub: &'a str) -> Option<&'a str> {
    let rest = sub.strip_prefix(name)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix('.')
    }
}

/// One segment of a sub-name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    /// The segment text; object segments include their trailing `.`.
    pub segment: &'a str,
    /// Whether this is the leaf element.
    pub is_leaf: bool,
}

/// Iterator over the [`Token`]s of a sub-name. Created by [`tokens`].
#[derive(Clone, Debug)]
pub struct Tokens<'a> {
    rest: &'a str,
}

/// Splits a sub-name into segments.
///
/// ```
/// use linkview_core::subname::{Token, tokens};
///
/// let t: Vec<_> = tokens("Body.Pad.Face1").collect();
/// assert_eq!(t[0], Token { segment: "Body.", is_leaf: false });
/// assert_eq!(t[2], Token { segment: "Face1", is_leaf: true });
/// ```
#[must_use]
pub fn tokens(sub: &str) -> Tokens<'_> {
    Tokens { rest: sub }
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.rest.is_empty() {
            return None;
        }
        if is_mapped_element(self.rest) {
            let segment = core::mem::take(&mut self.rest);
            return Some(Token {
                segment,
                is_leaf: true,
            });
        }
        match self.rest.find('.') {
            Some(dot) => {
                let (segment, rest) = self.rest.split_at(dot + 1);
                self.rest = rest;
                Some(Token {
                    segment,
                    is_leaf: false,
                })
            }
            None => Some(Token {
                segment: core::mem::take(&mut self.rest),
                is_leaf: true,
            }),
        }
    }
}

/// Rewrites a sub-name below a container to the form its graph uses.
///
/// A container displays every object it holds directly under its child
/// root, even objects that are symbolically nested (`Body.Pad.Sketch.` is
/// drawn as a sibling of `Pad`). Starting at `sub`, this skips leading object
/// segments as long as the container itself holds the named object and that
/// object is not a container of its own. Descent also stops before a leaf
/// element.
///
/// Returns the suffix of `sub` that names a direct child of the container,
/// or `None` if `sub` has no object segment or names an object that does not
/// exist.
#[must_use]
pub fn flattened_subname<'a, S: LinkedObjectSource + ?Sized>(
    src: &S,
    container: ObjectId,
    sub: &'a str,
) -> Option<&'a str> {
    let mut toks = tokens(sub).peekable();
    if toks.peek().is_none_or(|t| t.is_leaf) {
        return None;
    }

    let mut found = sub;
    let mut offset = 0;
    let mut sobj = container;
    while let Some(tok) = toks.next() {
        if tok.is_leaf || src.sub_object(container, tok.segment, false).is_none() {
            break;
        }
        found = &sub[offset..];
        sobj = src.sub_object(sobj, tok.segment, false)?.0;
        if src.child_root(sobj).is_some() {
            break;
        }
        offset += tok.segment.len();
        if toks.peek().is_none_or(|t| t.is_leaf) {
            break;
        }
    }
    Some(found)
}
