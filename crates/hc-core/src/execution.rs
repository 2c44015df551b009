// SPDX-License-Identifier: MIT OR Apache-2.0
//! The cascade execution state machine.
//!
//! [`CascadeExecution`] is purely value-level: no I/O happens here, only
//! transitions. It is closed under [`record_wave_completion`]
//! (confidence-gated progression with escalation), [`approve_wave`], and
//! [`abort`]. The wave executor owns an execution for its lifetime and
//! returns terminal-state values to the caller.
//!
//! [`record_wave_completion`]: CascadeExecution::record_wave_completion
//! [`approve_wave`]: CascadeExecution::approve_wave
//! [`abort`]: CascadeExecution::abort

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::confidence::WaveConfidence;
use crate::preview::CascadePreview;

/// Progression policy knobs for a cascade execution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ExecutionPolicy {
    /// Continue past clean waves without pausing for approval.
    pub auto_approve: bool,
    /// Waves scoring below this pause for approval (default 0.7).
    pub confidence_threshold: f64,
    /// Consecutive low-confidence waves before escalating to a human
    /// (default 2).
    pub max_consecutive_low_confidence: u32,
}

impl Default for ExecutionPolicy {
    fn default() -> Self {
        Self {
            auto_approve: false,
            confidence_threshold: 0.7,
            max_consecutive_low_confidence: 2,
        }
    }
}

/// The live state of a cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CascadeExecution {
    /// The frozen preview this execution is driving.
    pub preview: CascadePreview,
    /// Index of the next wave to run.
    pub current_wave: u32,
    /// Confidence records for completed waves, in wave order.
    pub wave_confidences: Vec<WaveConfidence>,
    /// Continue past clean waves without pausing.
    pub auto_approve: bool,
    /// Waves scoring below this pause for approval.
    pub confidence_threshold: f64,
    /// Consecutive low-confidence waves before escalation.
    pub max_consecutive_low_confidence: u32,
    /// Current run of consecutive low-confidence waves.
    pub consecutive_low_confidence: u32,
    /// Waiting on [`approve_wave`](Self::approve_wave).
    pub paused_for_approval: bool,
    /// Every wave has completed.
    pub completed: bool,
    /// Terminally aborted.
    pub aborted: bool,
    /// Repeated low confidence forced human review; auto-approve is off.
    pub escalated_to_human: bool,
    /// Why the execution was aborted, when it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
}

impl CascadeExecution {
    /// Create a fresh execution over `preview` with the given policy.
    #[must_use]
    pub fn new(preview: CascadePreview, policy: ExecutionPolicy) -> Self {
        Self {
            preview,
            current_wave: 0,
            wave_confidences: Vec::new(),
            auto_approve: policy.auto_approve,
            confidence_threshold: policy.confidence_threshold,
            max_consecutive_low_confidence: policy.max_consecutive_low_confidence,
            consecutive_low_confidence: 0,
            paused_for_approval: false,
            completed: false,
            aborted: false,
            escalated_to_human: false,
            abort_reason: None,
        }
    }

    /// Mean confidence across recorded waves; `0.0` before any wave.
    #[must_use]
    pub fn overall_confidence(&self) -> f64 {
        if self.wave_confidences.is_empty() {
            return 0.0;
        }
        self.wave_confidences.iter().map(|c| c.confidence).sum::<f64>()
            / self.wave_confidences.len() as f64
    }

    /// `true` once the execution can make no further progress.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.completed || self.aborted
    }

    /// Record the verifier's score for the wave that just finished and
    /// advance the state machine.
    ///
    /// Low confidence increments the consecutive-low counter; hitting the
    /// configured maximum escalates to a human (clearing auto-approve).
    /// Either way a low-confidence wave pauses for approval. A clean wave
    /// resets the counter and pauses only when auto-approve is off.
    pub fn record_wave_completion(&mut self, conf: WaveConfidence) {
        if self.is_terminal() {
            return;
        }

        let low = conf.confidence < self.confidence_threshold;
        self.wave_confidences.push(conf);

        if low {
            self.consecutive_low_confidence += 1;
            if self.consecutive_low_confidence >= self.max_consecutive_low_confidence {
                self.escalated_to_human = true;
                self.auto_approve = false;
            }
            self.paused_for_approval = true;
        } else {
            self.consecutive_low_confidence = 0;
            if !self.auto_approve {
                self.paused_for_approval = true;
            }
        }

        self.current_wave += 1;
        if self.current_wave >= self.preview.wave_count() {
            self.completed = true;
        }
    }

    /// Clear a pause so the executor may continue with the next wave.
    ///
    /// No-op on terminal executions.
    pub fn approve_wave(&mut self) {
        if self.aborted {
            return;
        }
        self.paused_for_approval = false;
    }

    /// Put the execution into the terminal aborted state.
    ///
    /// Idempotent: the first reason wins and later calls change nothing.
    pub fn abort(&mut self, reason: impl Into<String>) {
        if self.aborted {
            return;
        }
        self.aborted = true;
        self.abort_reason = Some(reason.into());
        self.paused_for_approval = false;
    }

    /// Why the last recorded wave paused the execution, if it did.
    #[must_use]
    pub fn pause_reason(&self) -> Option<crate::event::PauseReason> {
        if !self.paused_for_approval {
            return None;
        }
        if self.escalated_to_human {
            Some(crate::event::PauseReason::Escalation)
        } else if self
            .wave_confidences
            .last()
            .is_some_and(|c| c.confidence < self.confidence_threshold)
        {
            Some(crate::event::PauseReason::LowConfidence)
        } else {
            Some(crate::event::PauseReason::Manual)
        }
    }
}
