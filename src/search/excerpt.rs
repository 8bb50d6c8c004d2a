//! Term-dense excerpt selection for result previews.
//!
//! Every match of any highlight term is tried as the center of a
//! `max_length`-character window; the window covering the most distinct terms
//! wins (earliest on ties). The window is then widened to whitespace so no
//! word is cut, and marked with [`ELLIPSIS`] where it stops short of the text.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

use crate::error::Result;

pub const ELLIPSIS: &str = "...";

/// Terms shorter than this only match as whole words.
const WHOLE_WORD_BELOW: usize = 5;

pub struct Highlighter {
   /// One capture group per distinct term, in term order.
   pattern: Option<Regex>,
}

struct Hit {
   start: usize,
   end:   usize,
   term:  usize,
}

impl Highlighter {
   pub fn new<S: AsRef<str>>(terms: &[S]) -> Result<Self> {
      let mut seen = HashSet::new();
      let mut terms: Vec<String> = terms
         .iter()
         .map(|t| t.as_ref().trim())
         .filter(|t| !t.is_empty())
         .filter(|t| seen.insert(t.to_lowercase()))
         .map(String::from)
         .collect();

      if terms.is_empty() {
         return Ok(Self { pattern: None });
      }

      // Longest first so a term is never shadowed by its own prefix.
      terms.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));

      let alternation = terms
         .iter()
         .map(|t| {
            let escaped = regex::escape(t);
            if t.chars().count() < WHOLE_WORD_BELOW {
               format!(r"(\b(?:{escaped})\b)")
            } else {
               format!("({escaped})")
            }
         })
         .collect::<Vec<_>>()
         .join("|");

      let pattern = RegexBuilder::new(&alternation)
         .case_insensitive(true)
         .build()?;

      Ok(Self { pattern: Some(pattern) })
   }

   /// Picks the most term-dense window of about `max_length` characters.
   pub fn select(&self, text: &str, max_length: usize) -> String {
      let bounds: Vec<usize> = text
         .char_indices()
         .map(|(b, _)| b)
         .chain(std::iter::once(text.len()))
         .collect();
      let char_len = bounds.len() - 1;

      if char_len <= max_length {
         return text.to_string();
      }

      let hits = self.find_hits(text, &bounds);
      if hits.is_empty() {
         return text[..bounds[max_length]].to_string();
      }

      let distinct_total = hits.iter().map(|h| h.term).collect::<HashSet<_>>().len();
      let mut best: Option<(usize, usize, usize)> = None;

      for hit in &hits {
         let (start, end) = window_around(hit, max_length, char_len);
         let covered = hits
            .iter()
            .filter(|h| h.start >= start && h.end <= end)
            .map(|h| h.term)
            .collect::<HashSet<_>>()
            .len();

         if best.is_none_or(|(_, _, count)| covered > count) {
            best = Some((start, end, covered));
            if covered == distinct_total {
               break;
            }
         }
      }

      let Some((start, end, _)) = best else {
         return text[..bounds[max_length]].to_string();
      };
      let (start, end) = snap_to_whitespace(text, &bounds, start, end);

      let mut excerpt = String::with_capacity(bounds[end] - bounds[start] + 2 * ELLIPSIS.len());
      if start > 0 {
         excerpt.push_str(ELLIPSIS);
      }
      excerpt.push_str(text[bounds[start]..bounds[end]].trim());
      if end < char_len {
         excerpt.push_str(ELLIPSIS);
      }
      excerpt
   }

   /// All matches in one scan, as char ranges tagged with their term.
   fn find_hits(&self, text: &str, bounds: &[usize]) -> Vec<Hit> {
      let Some(pattern) = &self.pattern else {
         return Vec::new();
      };

      pattern
         .captures_iter(text)
         .filter_map(|caps| {
            let (term, m) = caps
               .iter()
               .enumerate()
               .skip(1)
               .find_map(|(group, m)| Some((group - 1, m?)))?;
            let start = bounds.binary_search(&m.start()).ok()?;
            let end = bounds.binary_search(&m.end()).ok()?;
            Some(Hit { start, end, term })
         })
         .collect()
   }
}

/// Selects an excerpt of `text` around `terms`. Falls back to the leading
/// `max_length` characters if the terms cannot be compiled.
pub fn select_excerpt<S: AsRef<str>>(text: &str, terms: &[S], max_length: usize) -> String {
   match Highlighter::new(terms) {
      Ok(highlighter) => highlighter.select(text, max_length),
      Err(e) => {
         tracing::warn!("excerpt highlighting disabled: {e}");
         text.chars().take(max_length).collect()
      },
   }
}

/// Window of `max_length` chars with the match in the middle, clamped to the text.
fn window_around(hit: &Hit, max_length: usize, char_len: usize) -> (usize, usize) {
   let match_len = hit.end - hit.start;
   let before = max_length.saturating_sub(match_len) / 2;
   let mut start = hit.start.saturating_sub(before);
   let end = (start + max_length).min(char_len);
   if end - start < max_length {
      start = end.saturating_sub(max_length);
   }
   (start, end)
}

/// Widens `[start, end)` until both edges sit on whitespace or a text edge.
fn snap_to_whitespace(
   text: &str,
   bounds: &[usize],
   mut start: usize,
   mut end: usize,
) -> (usize, usize) {
   let char_len = bounds.len() - 1;
   let is_space_at = |i: usize| {
      text[bounds[i]..bounds[i + 1]]
         .chars()
         .next()
         .is_some_and(char::is_whitespace)
   };

   while start > 0 && !is_space_at(start - 1) {
      start -= 1;
   }
   while end < char_len && !is_space_at(end) {
      end += 1;
   }
   (start, end)
}
