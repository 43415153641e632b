//! Baggage lifecycle state machine.
//!
//! Every transition follows the same sequence:
//! 1. Check and apply under the store's write lock (`commit_with`)
//! 2. Append the audit entry on the committed record, still under that lock,
//!    so per-record audit order matches commit order
//! 3. Mirror to the remote gateway after the lock is released
//!
//! Delivered is terminal and is reached only through the security handover.
//! A failed identity verification is audited as a Security failure; other
//! rejections are only logged.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{AuditDraft, AuditEntry, AuditLog};
use crate::clock::Clock;
use crate::config::EngineSettings;
use crate::error::{HandoverField, TraceError, TraceResult};
use crate::gateway::{RemoteGateway, SyncOutcome};
use crate::logging::structured::LogContext;
use crate::storage::models::{BaggageRecord, BaggageStatus, HistoryEntry, RecordPatch};
use crate::storage::store::RecordStore;
use crate::{log_info, log_warn};

use super::handover::HandoverRecord;
use super::sla::{assess, classify, SlaAssessment, SlaBand};

/// Actor recorded for time-based escalations.
pub const SYSTEM_ACTOR: &str = "SGS System";

/// Actor recorded for passenger self-service claims.
pub const PASSENGER_ACTOR: &str = "Passenger (Self-service)";

/// What a successful transition produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub record: BaggageRecord,
    pub audit: AuditEntry,
    pub sync: SyncOutcome,
}

/// Instruction shown to a passenger after a confirmed self-claim.
pub fn pickup_instruction(location: &str) -> String {
    format!(
        "Please proceed to {} to collect your bag. Saudi Ground Services (SGS) team is waiting for you.",
        location
    )
}

pub struct LifecycleEngine {
    store: Arc<RecordStore>,
    audit: Arc<AuditLog>,
    gateway: Arc<RemoteGateway>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
}

impl LifecycleEngine {
    pub fn new(
        store: Arc<RecordStore>,
        audit: Arc<AuditLog>,
        gateway: Arc<RemoteGateway>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            audit,
            gateway,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Staff-driven move between non-Delivered states.
    pub fn manual_status_change(
        &self,
        report_id: &str,
        to: BaggageStatus,
        actor: &str,
        ctx: &LogContext,
    ) -> TraceResult<TransitionOutcome> {
        let ctx = ctx.with_report(report_id);
        let now = self.clock.now();

        self.transition(report_id, "MANUAL_STATUS_CHANGE", &ctx, |current| {
            if current.status.is_terminal()
                || to == BaggageStatus::Delivered
                || to == current.status
            {
                return Err(invalid(current, to));
            }
            let patch = RecordPatch::new().status(to).history(HistoryEntry {
                timestamp: now,
                status_label: to.as_str().to_string(),
                location: current.current_location.clone(),
                details: format!("Status changed from {} to {} by {}.", current.status, to, actor),
            });
            let draft = AuditDraft::operations(
                actor,
                "Status change",
                &format!("{}: {} -> {}", current.report_id, current.status, to),
            );
            Ok((patch, draft))
        })
    }

    /// Passenger claims a found bag after seeing its photos and answering
    /// the same verification questions as a handover.
    pub fn passenger_self_claim(
        &self,
        report_id: &str,
        form: &HandoverRecord,
        visually_confirmed: bool,
        ctx: &LogContext,
    ) -> TraceResult<TransitionOutcome> {
        let ctx = ctx.with_report(report_id);
        let now = self.clock.now();
        let actor = claim_actor(form);

        let result = self.transition(report_id, "PASSENGER_SELF_CLAIM", &ctx, |current| {
            if current.status != BaggageStatus::FoundAwaitingClaim {
                return Err(invalid(current, BaggageStatus::InProgress));
            }
            let mut missing = form.missing_fields();
            if !visually_confirmed {
                missing.push(HandoverField::VisualConfirmation);
            }
            if !missing.is_empty() {
                return Err(TraceError::IncompletePreconditions {
                    report_id: current.report_id.clone(),
                    missing,
                });
            }
            let patch = RecordPatch::new()
                .status(BaggageStatus::InProgress)
                .confirmed(true)
                .next_step(&pickup_instruction(&current.current_location))
                .history(HistoryEntry {
                    timestamp: now,
                    status_label: "Passenger Confirmed Ownership".to_string(),
                    location: current.current_location.clone(),
                    details: format!(
                        "The passenger inspected the visual data and confirmed this is their bag. {}",
                        form.claim_details()
                    ),
                });
            let draft = AuditDraft::security(
                &actor,
                "Baggage ownership confirmation",
                &format!(
                    "{}: ownership confirmed by visual match and security questions ({}).",
                    current.report_id,
                    form.masked_summary()
                ),
            );
            Ok((patch, draft))
        });
        self.audit_failed_verification(result, &actor, "Baggage ownership confirmation")
    }

    /// Final release to a verified recipient. The only way into Delivered.
    pub fn security_handover(
        &self,
        report_id: &str,
        form: &HandoverRecord,
        officer: &str,
        ctx: &LogContext,
    ) -> TraceResult<TransitionOutcome> {
        let ctx = ctx.with_report(report_id);
        let now = self.clock.now();

        let result = self.transition(report_id, "SECURITY_HANDOVER", &ctx, |current| {
            if current.status.is_terminal() {
                return Err(invalid(current, BaggageStatus::Delivered));
            }
            let missing = form.missing_fields();
            if !missing.is_empty() {
                return Err(TraceError::IncompletePreconditions {
                    report_id: current.report_id.clone(),
                    missing,
                });
            }
            let patch = RecordPatch::new()
                .status(BaggageStatus::Delivered)
                .confirmed(true)
                .history(HistoryEntry {
                    timestamp: now,
                    status_label: "Security Handover (SGS)".to_string(),
                    location: current.current_location.clone(),
                    details: form.history_details(),
                });
            let draft = AuditDraft::security(
                officer,
                "Final security handover",
                &format!(
                    "{}: released after identity verification ({}).",
                    current.report_id,
                    form.masked_summary()
                ),
            );
            Ok((patch, draft))
        });
        self.audit_failed_verification(result, officer, "Final security handover")
    }

    /// Move every record in SLA breach to Urgent. Delivered, Resolved and
    /// already-Urgent records are left alone.
    pub fn escalate_overdue(&self, now: DateTime<Utc>, ctx: &LogContext) -> Vec<TransitionOutcome> {
        let limit = self.settings.sla_limit();
        let overdue = self.store.find(|record| {
            is_escalatable(record) && classify(record.last_update, now, limit) == SlaBand::Breach
        });

        let mut escalated = Vec::with_capacity(overdue.len());
        for candidate in overdue {
            let record_ctx = ctx.with_report(&candidate.report_id);
            let result = self.transition(&candidate.report_id, "SLA_ESCALATION", &record_ctx, |current| {
                // Re-check under the lock; the record may have moved since the scan.
                if !is_escalatable(current)
                    || classify(current.last_update, now, limit) != SlaBand::Breach
                {
                    return Err(invalid(current, BaggageStatus::Urgent));
                }
                let elapsed = assess(current.last_update, now, limit);
                let patch = RecordPatch::new().status(BaggageStatus::Urgent).history(HistoryEntry {
                    timestamp: now,
                    status_label: BaggageStatus::Urgent.as_str().to_string(),
                    location: current.current_location.clone(),
                    details: format!(
                        "Escalated automatically: no update for {}h {}m.",
                        elapsed.elapsed_hours, elapsed.elapsed_minutes
                    ),
                });
                let draft = AuditDraft::operations(
                    SYSTEM_ACTOR,
                    "SLA escalation",
                    &format!("{}: {} -> {}", current.report_id, current.status, BaggageStatus::Urgent),
                );
                Ok((patch, draft))
            });
            if let Ok(outcome) = result {
                escalated.push(outcome);
            }
        }

        log_info!(ctx, "SLA_ESCALATION_SWEEP", escalated = escalated.len());
        escalated
    }

    /// Current SLA standing of a record.
    pub fn sla_assessment(&self, report_id: &str) -> TraceResult<SlaAssessment> {
        let record = self
            .store
            .get(report_id)
            .ok_or_else(|| TraceError::NotFound(report_id.trim().to_uppercase()))?;
        Ok(assess(record.last_update, self.clock.now(), self.settings.sla_limit()))
    }

    /// Staff edits to non-status fields (location, next step, ETA, ...).
    pub fn edit_details(
        &self,
        report_id: &str,
        patch: RecordPatch,
        actor: &str,
        ctx: &LogContext,
    ) -> TraceResult<TransitionOutcome> {
        let ctx = ctx.with_report(report_id);
        self.transition(report_id, "RECORD_EDIT", &ctx, |current| {
            if patch.status_change().is_some() {
                return Err(invalid(current, current.status));
            }
            let draft = AuditDraft::operations(
                actor,
                "Record edit",
                &format!("{}: details updated.", current.report_id),
            );
            Ok((patch, draft))
        })
    }

    /// Commit, audit under the same lock, then mirror. Rejections are logged.
    fn transition<F>(
        &self,
        report_id: &str,
        event: &str,
        ctx: &LogContext,
        decide: F,
    ) -> TraceResult<TransitionOutcome>
    where
        F: FnOnce(&BaggageRecord) -> TraceResult<(RecordPatch, AuditDraft)>,
    {
        let committed = self.store.commit_with(report_id, decide, |record, draft| {
            self.audit.append(draft.for_report(&record.report_id))
        });
        let (record, patch, audit) = match committed {
            Ok(committed) => committed,
            Err(err) => {
                log_warn!(
                    ctx,
                    "TRANSITION_REJECTED",
                    op = event,
                    reason = err.reason(),
                    error = err.to_string(),
                );
                return Err(err);
            }
        };

        let sync = self.gateway.push(&record, &patch);

        log_info!(
            ctx,
            event,
            status = record.status.as_str(),
            audit_seq = audit.sequence,
            sync = sync,
        );
        Ok(TransitionOutcome { record, audit, sync })
    }

    /// Record a failed identity check as a Security failure. Missing fields
    /// are named; no form values are written.
    fn audit_failed_verification(
        &self,
        result: TraceResult<TransitionOutcome>,
        actor: &str,
        action: &str,
    ) -> TraceResult<TransitionOutcome> {
        if let Err(TraceError::IncompletePreconditions { report_id, missing }) = &result {
            let fields: Vec<&str> = missing.iter().map(HandoverField::as_str).collect();
            self.audit.append(
                AuditDraft::security(
                    actor,
                    action,
                    &format!("{}: verification incomplete ({}).", report_id, fields.join(", ")),
                )
                .for_report(report_id)
                .failed(),
            );
        }
        result
    }
}

/// Audit actor for a self-claim: the verified recipient.
fn claim_actor(form: &HandoverRecord) -> String {
    let name = form.recipient_name.trim();
    if name.is_empty() {
        PASSENGER_ACTOR.to_string()
    } else {
        name.to_string()
    }
}

fn is_escalatable(record: &BaggageRecord) -> bool {
    !matches!(
        record.status,
        BaggageStatus::Delivered | BaggageStatus::Resolved | BaggageStatus::Urgent
    )
}

fn invalid(current: &BaggageRecord, to: BaggageStatus) -> TraceError {
    TraceError::InvalidTransition {
        report_id: current.report_id.clone(),
        from: current.status,
        to,
    }
}
