//! System-prompt assembly from retrieved archive documents.
//!
//! The prompt's stance depends on retrieval quality: with nothing retrieved
//! the model must say so, with only weak matches the documents are optional
//! background, and with at least one strong match the model answers from
//! the documents alone.

use std::fmt::Write as _;

use crate::{chat::Message, types::ArchiveDocument};

/// Words that mark a how-to question.
const PROCEDURE_WORDS: [&str; 7] =
   ["test", "procedure", "method", "technique", "algorithm", "protocol", "steps"];

const PREAMBLE: &str = "You are a research assistant for the DPRG (Dallas Personal Robotics \
                        Group) mailing list archive.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextBranch {
   NoDocuments { procedural: bool },
   LowConfidence,
   Confident,
}

impl ContextBranch {
   pub fn classify(documents: &[ArchiveDocument], query_text: &str, threshold: f32) -> Self {
      if documents.is_empty() {
         return Self::NoDocuments { procedural: is_procedural(query_text) };
      }
      if documents.iter().any(|d| d.score >= threshold) {
         Self::Confident
      } else {
         Self::LowConfidence
      }
   }
}

/// True when the query looks like a request for a procedure or method.
pub fn is_procedural(query_text: &str) -> bool {
   query_text
      .split(|c: char| !c.is_alphanumeric())
      .filter(|w| !w.is_empty())
      .map(str::to_lowercase)
      .any(|word| {
         let stem = word.trim_end_matches('s');
         PROCEDURE_WORDS
            .iter()
            .any(|kw| word == *kw || stem == kw.trim_end_matches('s'))
      })
}

pub fn build_context(documents: &[ArchiveDocument], query_text: &str, threshold: f32) -> String {
   let mut prompt = String::from(PREAMBLE);
   prompt.push_str("\n\n");

   match ContextBranch::classify(documents, query_text, threshold) {
      ContextBranch::NoDocuments { procedural } => {
         let _ = write!(
            prompt,
            "The archive search returned no messages for the question \"{query_text}\". Tell \
             the user plainly that the archive has no data on this."
         );
         if procedural {
            prompt.push_str(
               " The question asks how something is done. After stating that the archive has \
                no record of it, give a detailed, step-by-step answer from general knowledge \
                and label that part clearly as general knowledge, not archive content.",
            );
         } else {
            prompt.push_str(
               " Do not invent archive content. Any general guidance you add must be marked as \
                not coming from the archive.",
            );
         }
      },
      ContextBranch::LowConfidence => {
         prompt.push_str(
            "The archive messages below are weak matches for the question. Use them only if \
             they actually help. If they do not answer it, say so and answer from general \
             knowledge, stating explicitly that you are doing so.\n\n",
         );
         render_documents(&mut prompt, documents);
      },
      ContextBranch::Confident => {
         prompt.push_str(
            "Answer using only the archive messages below, citing titles or authors where \
             useful. If the messages do not contain the answer, say the archive does not cover \
             it rather than guessing.\n\n",
         );
         render_documents(&mut prompt, documents);
      },
   }

   prompt
}

/// New history with `context` as a leading system message.
pub fn with_context(history: &[Message], context: String) -> Vec<Message> {
   let mut messages = Vec::with_capacity(history.len() + 1);
   messages.push(Message::system(context));
   messages.extend_from_slice(history);
   messages
}

fn render_documents(prompt: &mut String, documents: &[ArchiveDocument]) {
   for (i, doc) in documents.iter().enumerate() {
      let meta = &doc.metadata;
      let _ = writeln!(prompt, "Document {}:", i + 1);
      let _ = writeln!(prompt, "Title: {}", meta.title.as_deref().unwrap_or("Untitled"));
      let _ = writeln!(prompt, "Author: {}", meta.author.as_deref().unwrap_or("Unknown"));
      let _ = writeln!(prompt, "Date: {}", meta.display_date());
      let _ = writeln!(prompt, "Content: {}\n", doc.text_excerpt);
   }
}
