//! Textual revision-reference resolution.
//!
//! Supports the full reference grammar:
//! - `ae1027a6acf` - exact revision id
//! - `ae10` - unique id prefix
//! - `head` / `heads` - the single head / all heads
//! - `base` / `bases` - the position before any revision
//! - `billing@head` - head of the branch labeled `billing`
//! - `billing@base` - base of the branch labeled `billing`
//! - `billing` - the revision carrying the branch label
//! - `<anchor>+N` / `<anchor>-N` - N steps downstream/upstream of the
//!   anchor, counted along the concrete iteration order

use std::collections::BTreeSet;

use crate::error::{CoreError, CoreResult};
use crate::graph::{join_ids, RevisionGraph};
use crate::revision::Revision;
use crate::revision_id::RevisionId;

/// Parsed form of a reference string.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ParsedRef {
    /// `head` or `branch@head` - requires a single candidate.
    Head { branch: Option<String> },
    /// `heads` or `branch@heads` - all candidates.
    Heads { branch: Option<String> },
    /// `base` or `branch@base`.
    Base { branch: Option<String> },
    /// `bases`.
    Bases,
    /// An id, id prefix, or branch label, optionally branch-qualified.
    Symbol {
        branch: Option<String>,
        symbol: String,
    },
}

/// Split a trailing `+N` / `-N` relative offset off a reference.
fn split_relative(reference: &str) -> Option<(&str, i64)> {
    let pos = reference.rfind(['+', '-'])?;
    let (anchor, tail) = reference.split_at(pos);
    let digits = &tail[1..];
    if anchor.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: i64 = digits.parse().ok()?;
    Some((anchor, if tail.starts_with('-') { -n } else { n }))
}

fn parse_symbol(reference: &str) -> ParsedRef {
    let (branch, symbol) = match reference.split_once('@') {
        Some((branch, rest)) => (Some(branch.to_string()), rest),
        None => (None, reference),
    };
    match symbol {
        "head" => ParsedRef::Head { branch },
        "heads" => ParsedRef::Heads { branch },
        "base" => ParsedRef::Base { branch },
        "bases" => ParsedRef::Bases,
        _ => ParsedRef::Symbol {
            branch,
            symbol: symbol.to_string(),
        },
    }
}

impl RevisionGraph {
    /// Resolve a reference string to the revisions it names.
    ///
    /// `base`/`bases` resolve to the empty list (the position before any
    /// revision). An ambiguous id prefix is an error naming every
    /// candidate.
    pub fn resolve(&self, reference: &str) -> CoreResult<Vec<&Revision>> {
        let ids = self.resolve_ids(reference)?;
        Ok(ids
            .iter()
            .filter_map(|id| self.get(id.as_str()))
            .collect())
    }

    /// Resolve a reference string to a set of revision ids.
    pub fn resolve_ids(&self, reference: &str) -> CoreResult<BTreeSet<RevisionId>> {
        let reference = reference.trim();

        if let Some((anchor, offset)) = split_relative(reference) {
            return self.resolve_relative(reference, anchor, offset);
        }

        match parse_symbol(reference) {
            ParsedRef::Head { branch } => {
                let candidates = self.head_candidates(branch.as_deref())?;
                match candidates.len() {
                    0 => Err(CoreError::NotFound {
                        reference: reference.to_string(),
                    }),
                    1 => Ok(candidates),
                    _ => Err(CoreError::MultipleHeads {
                        candidates: join_ids(&candidates),
                    }),
                }
            }
            ParsedRef::Heads { branch } => self.head_candidates(branch.as_deref()),
            ParsedRef::Base { branch } => match branch {
                // Bare `base` is the position before any revision.
                None => Ok(BTreeSet::new()),
                Some(label) => self.branch_bases(&label),
            },
            ParsedRef::Bases => Ok(BTreeSet::new()),
            ParsedRef::Symbol { branch, symbol } => {
                let mut ids = self.resolve_symbol(&symbol)?;
                if let Some(label) = branch {
                    let members = self.branch_members(&label)?;
                    ids.retain(|id| members.contains(id));
                    if ids.is_empty() {
                        return Err(CoreError::NotFound {
                            reference: reference.to_string(),
                        });
                    }
                }
                Ok(ids)
            }
        }
    }

    fn head_candidates(&self, branch: Option<&str>) -> CoreResult<BTreeSet<RevisionId>> {
        match branch {
            Some(label) => self.branch_heads(label),
            None => Ok(self.heads().clone()),
        }
    }

    /// Resolve a bare symbol: branch label, exact id, then id prefix.
    fn resolve_symbol(&self, symbol: &str) -> CoreResult<BTreeSet<RevisionId>> {
        if let Some(anchor) = self.label_anchor(symbol) {
            return Ok(BTreeSet::from([anchor.clone()]));
        }
        if let Some(rev) = self.get(symbol) {
            return Ok(BTreeSet::from([rev.id.clone()]));
        }
        let matches = self.ids_by_prefix(symbol);
        match matches.len() {
            0 => Err(CoreError::NotFound {
                reference: symbol.to_string(),
            }),
            1 => Ok(BTreeSet::from([matches[0].clone()])),
            _ => Err(CoreError::AmbiguousPrefix {
                reference: symbol.to_string(),
                candidates: matches
                    .iter()
                    .map(|id| id.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }

    /// Resolve `<anchor>+N` / `<anchor>-N` by counting steps along the
    /// concrete iteration order.
    fn resolve_relative(
        &self,
        reference: &str,
        anchor: &str,
        offset: i64,
    ) -> CoreResult<BTreeSet<RevisionId>> {
        let anchor_ids = self.resolve_ids(anchor)?;
        let mut candidates = anchor_ids.into_iter();
        let (Some(anchor_id), None) = (candidates.next(), candidates.next()) else {
            return Err(CoreError::InvalidReference {
                reference: reference.to_string(),
                reason: format!("relative reference requires a single anchor, got '{anchor}'"),
            });
        };

        if offset == 0 {
            return Ok(BTreeSet::from([anchor_id]));
        }

        let (sequence, index) = if offset < 0 {
            let seq = self.iterate_ids(
                &BTreeSet::from([anchor_id.clone()]),
                &BTreeSet::new(),
                true,
            )?;
            // The anchor is the unique sink of its own ancestor closure,
            // so it sits last in the sequence.
            let index = (seq.len() as i64 - 1) + offset;
            (seq, index)
        } else {
            let branch = anchor.split_once('@').map(|(b, _)| b);
            let uppers = match branch {
                Some(label) => self.branch_heads(label)?,
                None => self
                    .heads()
                    .iter()
                    .filter(|h| {
                        *h == &anchor_id
                            || self.ancestors([*h], true).contains(&anchor_id)
                    })
                    .cloned()
                    .collect(),
            };
            let lowers = BTreeSet::from([anchor_id.clone()]);
            let seq = self.iterate_ids(&uppers, &lowers, true)?;
            // The anchor is the unique source of the range, position 0.
            (seq, offset)
        };

        if index < 0 || index as usize >= sequence.len() {
            return Err(CoreError::InvalidReference {
                reference: reference.to_string(),
                reason: format!(
                    "walks {} step(s) past the {} of the history",
                    if offset < 0 { -index } else { index - sequence.len() as i64 + 1 },
                    if offset < 0 { "base" } else { "head" }
                ),
            });
        }
        Ok(BTreeSet::from([sequence[index as usize].id.clone()]))
    }
}

#[cfg(test)]
#[path = "resolve_test.rs"]
mod tests;
