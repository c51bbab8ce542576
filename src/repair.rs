//! Removes failing directive blocks from model output.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;

use crate::config::GuardConfig;
use crate::directive::{Block, parse_directives};
use crate::metadata::CardCache;
use crate::rules::{DeckContext, Reason, RulePass, Severity, ValidationVerdict, Validator};

/// Fewer surviving blocks than this means the answer is too thin to show.
pub const MIN_BLOCKS_BEFORE_REGENERATION: usize = 3;

/// System message for a single regeneration attempt after heavy repair.
pub const REGENERATION_SYSTEM_MESSAGE: &str = "Previous suggestions included invalid, duplicate, or illegal cards. Regenerate recommendations using only legal, non-duplicate cards for this format. Preserve the original structure and tone; only repair the invalid recommendations.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairPass {
    Hard,
    Downgrade,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedDirective {
    /// ADD target as written by the model.
    pub card: String,
    pub reason: Reason,
    pub severity: Severity,
    /// Line range in the input of `pass`.
    pub block: Block,
    pub pass: RepairPass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairResult {
    pub repaired_text: String,
    pub removed: Vec<RemovedDirective>,
    pub blocks_remaining: usize,
    pub directives_parsed: usize,
}

impl RepairResult {
    pub fn removed_directives(&self) -> Vec<&str> {
        self.removed.iter().map(|entry| entry.card.as_str()).collect()
    }

    pub fn removal_reasons(&self) -> Vec<&Reason> {
        self.removed.iter().map(|entry| &entry.reason).collect()
    }

    pub fn is_clean(&self) -> bool {
        self.removed.is_empty()
    }

    pub fn needs_regeneration(&self) -> bool {
        self.directives_parsed > 0 && self.blocks_remaining < MIN_BLOCKS_BEFORE_REGENERATION
    }
}

/// Drops every line of every failing block and keeps the rest in order.
///
/// Lines are split on `\n` only, so a `\r\n` input keeps its `\r`. Blocks
/// never overlap, so removing one cannot disturb another.
pub fn repair(text: &str, verdicts: &[ValidationVerdict]) -> RepairResult {
    repair_pass(text, verdicts, RepairPass::Hard)
}

fn repair_pass(text: &str, verdicts: &[ValidationVerdict], pass: RepairPass) -> RepairResult {
    let mut drop_lines = BTreeSet::new();
    let mut removed = Vec::new();
    for verdict in verdicts {
        if let Some(reason) = verdict.reason() {
            drop_lines.extend(verdict.directive.block.range());
            removed.push(RemovedDirective {
                card: verdict.directive.name.clone(),
                reason: reason.clone(),
                severity: reason.severity(),
                block: verdict.directive.block,
                pass,
            });
        }
    }

    let repaired_text = if drop_lines.is_empty() {
        text.to_string()
    } else {
        text.split('\n')
            .enumerate()
            .filter(|(index, _)| !drop_lines.contains(index))
            .map(|(_, line)| line)
            .collect::<Vec<_>>()
            .join("\n")
    };

    RepairResult {
        repaired_text,
        blocks_remaining: verdicts.len() - removed.len(),
        directives_parsed: verdicts.len(),
        removed,
    }
}

/// Parse, validate and repair in two passes: hard rules first, then strict
/// downgrades over the cleaned text.
#[derive(Debug, Clone)]
pub struct Pipeline {
    validator: Validator,
}

impl Pipeline {
    pub fn new(config: &GuardConfig, cache: Arc<dyn CardCache>) -> Self {
        Self::with_validator(Validator::from_config(config, cache))
    }

    pub fn with_validator(validator: Validator) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn apply_all(&self, text: &str, context: &DeckContext) -> RepairResult {
        let directives = parse_directives(text, context.format);
        let verdicts = self
            .validator
            .validate_pass(&directives, context, RulePass::Hard);
        let hard = repair_pass(text, &verdicts, RepairPass::Hard);

        let survivors = parse_directives(&hard.repaired_text, context.format);
        let verdicts = self
            .validator
            .validate_pass(&survivors, context, RulePass::Downgrade);
        let soft = repair_pass(&hard.repaired_text, &verdicts, RepairPass::Downgrade);

        let mut removed = hard.removed;
        removed.extend(soft.removed);
        let result = RepairResult {
            repaired_text: soft.repaired_text,
            removed,
            blocks_remaining: soft.blocks_remaining,
            directives_parsed: hard.directives_parsed,
        };

        if !result.is_clean() {
            tracing::debug!(
                parsed = result.directives_parsed,
                removed = result.removed.len(),
                remaining = result.blocks_remaining,
                "repaired directive text"
            );
        }
        result
    }
}
