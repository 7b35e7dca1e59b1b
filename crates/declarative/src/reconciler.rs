//! Reconciler - the check-then-act protocol
//!
//! Every descriptor is evaluated sequentially, in declaration order:
//!
//! 1. not applicable on this platform -> `skipped`
//! 2. probe; current == desired -> `already-satisfied`
//! 3. apply; error -> `failed` (apply)
//! 4. probe again; desired -> `applied`, otherwise `failed` (verify)
//!
//! Per-resource errors never escape the loop; they become outcomes. Actions
//! mutate host-global state (package database, `/etc`), so nothing runs
//! concurrently. Running two reconcilers against the same host at the same
//! time is not supported.

use crate::context::{ApplyContext, NoProgress, ProgressCallback, SudoProvider};
use crate::planner::ExecutionPlan;
use crate::platform::Platform;
use crate::report::{FailureStage, NOT_APPLICABLE, Outcome, PlanReport, ReportBuilder};
use crate::resource::Descriptor;

/// Message recorded when an action succeeds but the host did not change
pub const VERIFY_MISMATCH: &str = "post-apply verification mismatch";

/// Drives a plan to its desired state on one platform
pub struct Reconciler<'a> {
    platform: &'a Platform,
    sudo: Option<&'a dyn SudoProvider>,
}

impl<'a> Reconciler<'a> {
    pub fn new(platform: &'a Platform) -> Self {
        Self {
            platform,
            sudo: None,
        }
    }

    /// Provide elevated privileges to actions that ask for them
    pub fn with_sudo(mut self, sudo: &'a dyn SudoProvider) -> Self {
        self.sudo = Some(sudo);
        self
    }

    /// Reconcile every descriptor without progress reporting
    pub fn run(&self, plan: &ExecutionPlan) -> PlanReport {
        self.run_with_progress(plan, &mut NoProgress)
    }

    /// Reconcile every descriptor, reporting progress along the way
    pub fn run_with_progress<P: ProgressCallback + ?Sized>(
        &self,
        plan: &ExecutionPlan,
        progress: &mut P,
    ) -> PlanReport {
        let mut report = ReportBuilder::new();
        progress.on_run_start(plan.len());

        for descriptor in plan.iter() {
            let resource = descriptor.resource();
            progress.on_resource_start(&resource.key(), &resource.description());

            let outcome = self.reconcile(descriptor);
            progress.on_resource_complete(&outcome);
            report.record(outcome);
        }

        let report = report.finish();
        progress.on_run_complete(&report);
        report
    }

    /// Apply the check-then-act protocol to a single descriptor
    pub fn reconcile(&self, descriptor: &Descriptor) -> Outcome {
        let resource = descriptor.resource();
        let kind = resource.kind();
        let key = resource.key();

        if !descriptor.applies_to(self.platform) {
            log::debug!("{kind}:{key} not applicable on {}", self.platform);
            return Outcome::skipped(kind, &key, NOT_APPLICABLE);
        }

        let desired = resource.desired_state();
        let current = match resource.probe(self.platform) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("{kind}:{key} probe failed: {e}");
                return Outcome::failed(
                    kind,
                    &key,
                    resource.description(),
                    FailureStage::Probe,
                    e.to_string(),
                );
            }
        };

        if current == desired {
            log::debug!("{kind}:{key} already satisfied ({current})");
            return Outcome::already_satisfied(kind, &key, current.to_string());
        }

        log::info!("{kind}:{key} is {current}, applying");
        let mut ctx = ApplyContext {
            platform: self.platform,
            sudo: self.sudo,
        };
        if let Err(e) = resource.apply(&mut ctx) {
            log::warn!("{kind}:{key} apply failed: {e}");
            return Outcome::failed(
                kind,
                &key,
                resource.description(),
                FailureStage::Apply,
                e.to_string(),
            );
        }

        match resource.probe(self.platform) {
            Ok(verified) if verified == desired => {
                log::debug!("{kind}:{key} verified");
                Outcome::applied(kind, &key, format!("{current} -> {verified}"))
            }
            Ok(verified) => {
                log::warn!("{kind}:{key} still {verified} after apply");
                Outcome::failed(
                    kind,
                    &key,
                    resource.description(),
                    FailureStage::Verify,
                    format!("{VERIFY_MISMATCH}: expected {desired}, found {verified}"),
                )
            }
            Err(e) => {
                log::warn!("{kind}:{key} verification probe failed: {e}");
                Outcome::failed(
                    kind,
                    &key,
                    resource.description(),
                    FailureStage::Verify,
                    e.to_string(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApplyError, ProbeError};
    use crate::platform::{Applicability, OsFamily, PackageManager};
    use crate::report::OutcomeStatus;
    use crate::resource::Resource;
    use crate::types::ResourceState;
    use std::io;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// How the fake action behaves
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Behavior {
        /// Apply makes the resource present
        Works,
        /// Apply returns an error
        Errors,
        /// Apply claims success without changing anything
        Lies,
        /// Probe itself fails
        ProbeFails,
    }

    #[derive(Debug, Default)]
    struct Counters {
        probes: AtomicUsize,
        applies: AtomicUsize,
    }

    #[derive(Debug)]
    struct Fake {
        key: String,
        present: AtomicBool,
        behavior: Behavior,
        counters: Arc<Counters>,
    }

    impl Fake {
        fn new(key: &str, present: bool, behavior: Behavior) -> (Self, Arc<Counters>) {
            let counters = Arc::new(Counters::default());
            let fake = Self {
                key: key.to_string(),
                present: AtomicBool::new(present),
                behavior,
                counters: Arc::clone(&counters),
            };
            (fake, counters)
        }
    }

    impl Resource for Fake {
        fn key(&self) -> String {
            self.key.clone()
        }

        fn kind(&self) -> &'static str {
            "fake"
        }

        fn description(&self) -> String {
            format!("fake {}", self.key)
        }

        fn desired_state(&self) -> ResourceState {
            ResourceState::present()
        }

        fn probe(&self, _platform: &Platform) -> Result<ResourceState, ProbeError> {
            self.counters.probes.fetch_add(1, Ordering::SeqCst);
            if self.behavior == Behavior::ProbeFails {
                return Err(ProbeError::io(
                    "/etc/shadow",
                    io::ErrorKind::PermissionDenied.into(),
                ));
            }
            if self.present.load(Ordering::SeqCst) {
                Ok(ResourceState::present())
            } else {
                Ok(ResourceState::Absent)
            }
        }

        fn apply(&self, _ctx: &mut ApplyContext) -> Result<(), ApplyError> {
            self.counters.applies.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Works => {
                    self.present.store(true, Ordering::SeqCst);
                    Ok(())
                }
                Behavior::Errors => Err(ApplyError::Command {
                    program: "apt-get".into(),
                    code: Some(100),
                    stderr: "E: Unable to locate package".into(),
                }),
                Behavior::Lies | Behavior::ProbeFails => Ok(()),
            }
        }
    }

    fn ubuntu() -> Platform {
        Platform::new(OsFamily::Linux, "ubuntu", PackageManager::Apt)
    }

    fn keys(report: &PlanReport) -> Vec<&str> {
        report.outcomes().iter().map(|o| o.key.as_str()).collect()
    }

    #[test]
    fn test_missing_resource_is_applied() {
        let (fake, counters) = Fake::new("zsh", false, Behavior::Works);
        let plan = ExecutionPlan::from_descriptors([Descriptor::from(fake)]).unwrap();
        let platform = ubuntu();

        let report = Reconciler::new(&platform).run(&plan);

        assert_eq!(report.outcomes()[0].status, OutcomeStatus::Applied);
        assert_eq!(report.outcomes()[0].note, "absent -> present");
        assert_eq!(counters.probes.load(Ordering::SeqCst), 2);
        assert_eq!(counters.applies.load(Ordering::SeqCst), 1);
        assert!(report.succeeded());
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let (a, _) = Fake::new("a", false, Behavior::Works);
        let (b, _) = Fake::new("b", true, Behavior::Works);
        let (c, c_counters) = Fake::new("c", false, Behavior::Works);
        let plan = ExecutionPlan::from_descriptors([
            Descriptor::from(a),
            Descriptor::from(b),
            Descriptor::from(c),
        ])
        .unwrap();
        let platform = ubuntu();
        let reconciler = Reconciler::new(&platform);

        let first = reconciler.run(&plan);
        assert_eq!(first.summary().applied, 2);
        assert_eq!(first.summary().already_satisfied, 1);

        let second = reconciler.run(&plan);
        assert_eq!(second.summary().already_satisfied, 3);
        assert_eq!(second.summary().applied, 0);
        assert_eq!(c_counters.applies.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_outcomes_follow_declaration_order() {
        let platform = ubuntu();
        let descriptors = ["e", "d", "c", "b", "a"].map(|key| {
            let (fake, _) = Fake::new(key, key == "c", Behavior::Works);
            let descriptor = Descriptor::from(fake);
            if key == "d" {
                descriptor.when(Applicability::family(OsFamily::Macos))
            } else {
                descriptor
            }
        });
        let plan = ExecutionPlan::from_descriptors(descriptors).unwrap();

        let report = Reconciler::new(&platform).run(&plan);

        assert_eq!(keys(&report), vec!["e", "d", "c", "b", "a"]);
        assert!(matches!(
            report.outcomes()[1].status,
            OutcomeStatus::Skipped { .. }
        ));
    }

    #[test]
    fn test_not_applicable_never_probes_or_applies() {
        let (fake, counters) = Fake::new("brave", false, Behavior::Works);
        let descriptor =
            Descriptor::from(fake).when(Applicability::package_manager(PackageManager::Pacman));
        let plan = ExecutionPlan::from_descriptors([descriptor]).unwrap();
        let platform = ubuntu();

        let report = Reconciler::new(&platform).run(&plan);

        assert_eq!(
            report.outcomes()[0].status,
            OutcomeStatus::Skipped {
                reason: NOT_APPLICABLE.to_string()
            }
        );
        assert_eq!(counters.probes.load(Ordering::SeqCst), 0);
        assert_eq!(counters.applies.load(Ordering::SeqCst), 0);
        assert!(report.succeeded());
    }

    #[test]
    fn test_failure_does_not_short_circuit() {
        let (first, _) = Fake::new("first", false, Behavior::Errors);
        let (second, second_counters) = Fake::new("second", false, Behavior::Works);
        let (third, _) = Fake::new("third", true, Behavior::Works);
        let plan = ExecutionPlan::from_descriptors([
            Descriptor::from(first),
            Descriptor::from(second),
            Descriptor::from(third),
        ])
        .unwrap();
        let platform = ubuntu();

        let report = Reconciler::new(&platform).run(&plan);

        match &report.outcomes()[0].status {
            OutcomeStatus::Failed { stage, error } => {
                assert_eq!(*stage, FailureStage::Apply);
                assert!(error.contains("apt-get exited with status 100"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(report.outcomes()[1].status, OutcomeStatus::Applied);
        assert_eq!(report.outcomes()[2].status, OutcomeStatus::AlreadySatisfied);
        assert_eq!(second_counters.applies.load(Ordering::SeqCst), 1);
        assert!(!report.succeeded());
    }

    #[test]
    fn test_lying_action_fails_verification() {
        let (fake, counters) = Fake::new("docker", false, Behavior::Lies);
        let plan = ExecutionPlan::from_descriptors([Descriptor::from(fake)]).unwrap();
        let platform = ubuntu();

        let report = Reconciler::new(&platform).run(&plan);

        match &report.outcomes()[0].status {
            OutcomeStatus::Failed { stage, error } => {
                assert_eq!(*stage, FailureStage::Verify);
                assert!(error.starts_with(VERIFY_MISMATCH));
            }
            other => panic!("expected verification failure, got {other:?}"),
        }
        assert_eq!(counters.probes.load(Ordering::SeqCst), 2);
        assert!(!report.succeeded());
    }

    #[test]
    fn test_probe_error_is_recorded_not_applied() {
        let (fake, counters) = Fake::new("shadow", false, Behavior::ProbeFails);
        let plan = ExecutionPlan::from_descriptors([Descriptor::from(fake)]).unwrap();
        let platform = ubuntu();

        let report = Reconciler::new(&platform).run(&plan);

        assert!(matches!(
            report.outcomes()[0].status,
            OutcomeStatus::Failed {
                stage: FailureStage::Probe,
                ..
            }
        ));
        assert_eq!(counters.applies.load(Ordering::SeqCst), 0);
    }

    #[derive(Default)]
    struct Recorder {
        started: Vec<String>,
        completed: usize,
        total: usize,
        finished: bool,
    }

    impl ProgressCallback for Recorder {
        fn on_run_start(&mut self, total: usize) {
            self.total = total;
        }

        fn on_resource_start(&mut self, key: &str, _description: &str) {
            self.started.push(key.to_string());
        }

        fn on_resource_complete(&mut self, _outcome: &Outcome) {
            self.completed += 1;
        }

        fn on_run_complete(&mut self, _report: &PlanReport) {
            self.finished = true;
        }
    }

    #[test]
    fn test_progress_callbacks() {
        let (a, _) = Fake::new("a", true, Behavior::Works);
        let (b, _) = Fake::new("b", false, Behavior::Works);
        let plan =
            ExecutionPlan::from_descriptors([Descriptor::from(a), Descriptor::from(b)]).unwrap();
        let platform = ubuntu();
        let mut recorder = Recorder::default();

        Reconciler::new(&platform).run_with_progress(&plan, &mut recorder);

        assert_eq!(recorder.total, 2);
        assert_eq!(recorder.started, vec!["a", "b"]);
        assert_eq!(recorder.completed, 2);
        assert!(recorder.finished);
    }
}
