//! Tracking service.
//!
//! Orchestrates the passenger and staff flows over the core components:
//! 1. Identify: resolve the identifier against the store and remote snapshot
//! 2. On a miss: present the unclaimed pool, optionally narrowed by description
//! 3. Select: a record known only to the network is adopted into the store
//! 4. Transition: self-claim, handover, manual change, escalation
//! 5. Each transition is persisted, audited and mirrored by the engine

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audit::AuditLog;
use crate::clock::Clock;
use crate::config::EngineSettings;
use crate::error::{TraceError, TraceResult};
use crate::gateway::RemoteGateway;
use crate::lifecycle::engine::{LifecycleEngine, TransitionOutcome};
use crate::lifecycle::handover::HandoverRecord;
use crate::lifecycle::sla::SlaAssessment;
use crate::logging::structured::LogContext;
use crate::resolution::identifier::{Identifier, IdentifierKind};
use crate::resolution::resolver::{IdentityResolver, PhotoComparison};
use crate::storage::models::{BaggageRecord, BaggageStatus};
use crate::storage::store::RecordStore;
use crate::{log_debug, log_info, log_warn};

use super::context::SessionContext;

/// Answer to an identification attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Identification {
    Found { record: BaggageRecord },
    /// Nothing matched; these found bags are offered for browsing.
    Unmatched { pool: Vec<BaggageRecord> },
}

/// Records to show after a description search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionMatch {
    pub records: Vec<BaggageRecord>,
    /// No confident match: `records` is the whole pool for manual browsing.
    pub manual_fallback: bool,
}

pub struct TrackingService {
    store: Arc<RecordStore>,
    gateway: Arc<RemoteGateway>,
    audit: Arc<AuditLog>,
    resolver: IdentityResolver,
    engine: LifecycleEngine,
    clock: Arc<dyn Clock>,
}

impl TrackingService {
    pub fn new(
        store: Arc<RecordStore>,
        gateway: Arc<RemoteGateway>,
        audit: Arc<AuditLog>,
        resolver: IdentityResolver,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
    ) -> Self {
        let engine = LifecycleEngine::new(
            Arc::clone(&store),
            Arc::clone(&audit),
            Arc::clone(&gateway),
            Arc::clone(&clock),
            settings,
        );
        Self {
            store,
            gateway,
            audit,
            resolver,
            engine,
            clock,
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn gateway(&self) -> &RemoteGateway {
        &self.gateway
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit
    }

    pub fn engine(&self) -> &LifecycleEngine {
        &self.engine
    }

    /// Resolve passenger input. A miss (including malformed input) yields
    /// the unclaimed pool instead of an error.
    pub fn identify(
        &self,
        kind: IdentifierKind,
        raw: &str,
        session: &SessionContext,
    ) -> Identification {
        let ctx = session.log_context();
        let snapshot = self.gateway.fetch_active();

        match self.resolver.resolve_raw(kind, raw, &self.store, &snapshot, &ctx) {
            Ok(record) => Identification::Found { record },
            Err(_) => {
                let pool = self.resolver.unclaimed_pool(&self.store, &snapshot);
                log_info!(ctx, "IDENTIFY_UNMATCHED", kind = kind.wire_tag(), pool = pool.len());
                Identification::Unmatched { pool }
            }
        }
    }

    /// Narrow `pool` by a free-text description, or fall back to all of it.
    pub fn describe(
        &self,
        text: &str,
        pool: &[BaggageRecord],
        session: &SessionContext,
    ) -> DescriptionMatch {
        let ctx = session.log_context();
        let matches = self.resolver.match_by_description(text, pool, &ctx);
        if matches.is_empty() {
            DescriptionMatch {
                records: pool.to_vec(),
                manual_fallback: true,
            }
        } else {
            DescriptionMatch {
                records: matches,
                manual_fallback: false,
            }
        }
    }

    /// Passenger self-claim of a found bag, gated by the verification form.
    pub fn confirm_ownership(
        &self,
        report_id: &str,
        form: &HandoverRecord,
        visually_confirmed: bool,
        session: &SessionContext,
    ) -> TraceResult<TransitionOutcome> {
        let ctx = session.log_context();
        self.ensure_local(report_id, session, &ctx);
        self.engine
            .passenger_self_claim(report_id, form, visually_confirmed, &ctx)
    }

    pub fn hand_over(
        &self,
        report_id: &str,
        form: &HandoverRecord,
        session: &SessionContext,
    ) -> TraceResult<TransitionOutcome> {
        let ctx = session.log_context();
        self.ensure_local(report_id, session, &ctx);
        self.engine
            .security_handover(report_id, form, &session.actor, &ctx)
    }

    pub fn change_status(
        &self,
        report_id: &str,
        to: BaggageStatus,
        session: &SessionContext,
    ) -> TraceResult<TransitionOutcome> {
        let ctx = session.log_context();
        self.ensure_local(report_id, session, &ctx);
        self.engine
            .manual_status_change(report_id, to, &session.actor, &ctx)
    }

    /// Compare the passenger's photo with the bag's photo on a record.
    pub fn compare_photos(
        &self,
        report_id: &str,
        session: &SessionContext,
    ) -> TraceResult<PhotoComparison> {
        let ctx = session.log_context().with_report(report_id);
        let record = match self.store.get(report_id) {
            Some(record) => record,
            None => self
                .search_remote(report_id)
                .ok_or_else(|| TraceError::NotFound(report_id.trim().to_uppercase()))?,
        };
        Ok(self.resolver.compare_photos(&record.media, &ctx))
    }

    /// Sweep for SLA breaches as of now.
    pub fn escalate_overdue(&self, session: &SessionContext) -> Vec<TransitionOutcome> {
        self.engine
            .escalate_overdue(self.clock.now(), &session.log_context())
    }

    pub fn sla(&self, report_id: &str) -> TraceResult<SlaAssessment> {
        self.engine.sla_assessment(report_id)
    }

    /// Copy remote active reports the store does not hold yet. Existing
    /// local records are never overwritten. Returns how many were added.
    pub fn import_remote(&self, session: &SessionContext) -> usize {
        let ctx = session.log_context();
        let mut added = 0;
        for record in self.gateway.fetch_active() {
            if self.adopt(record, &ctx) {
                added += 1;
            }
        }

        if added > 0 {
            self.audit.record_admin_action(
                &session.actor,
                "Remote import",
                &format!("{} report(s) imported from the tracing network.", added),
            );
        }
        log_info!(ctx, "REMOTE_IMPORT", added = added, total = self.store.len());
        added
    }

    /// Make sure a record picked from the remote snapshot or the unclaimed
    /// pool is in the store before it is transitioned. Unknown PIRs are left
    /// for the engine to reject as `NotFound`.
    fn ensure_local(&self, report_id: &str, session: &SessionContext, ctx: &LogContext) {
        if self.store.contains(report_id) {
            return;
        }
        let Some(record) = self.search_remote(report_id) else {
            return;
        };
        let pir = record.report_id.clone();
        if self.adopt(record, ctx) {
            self.audit.record_admin_action(
                &session.actor,
                "Remote import",
                &format!("{}: imported from the tracing network on selection.", pir),
            );
            log_info!(ctx, "REMOTE_RECORD_ADOPTED", pir = pir);
        }
    }

    /// PIR lookup on the network (or its fallback cache).
    fn search_remote(&self, report_id: &str) -> Option<BaggageRecord> {
        let identifier = Identifier::parse(IdentifierKind::ReportId, report_id).ok()?;
        self.gateway
            .search(&identifier)
            .filter(|record| record.matches_report_id(report_id))
    }

    /// Insert a remote record the store lacks. Returns whether it was added.
    fn adopt(&self, record: BaggageRecord, ctx: &LogContext) -> bool {
        if self.store.contains(&record.report_id) {
            return false;
        }
        match self.store.insert(record) {
            Ok(()) => true,
            // Lost a race with a concurrent insert of the same PIR.
            Err(TraceError::DuplicateReport(pir)) => {
                log_debug!(ctx, "REMOTE_IMPORT_SKIPPED", pir = pir);
                false
            }
            Err(err) => {
                log_warn!(ctx, "REMOTE_IMPORT_FAILED", error = err.to_string());
                false
            }
        }
    }
}
