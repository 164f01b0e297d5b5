mod common;

use std::sync::Arc;

use scheduling_cell::models::{
    AppointmentStatus, CandidateOutcome, RecurrenceEnd, RecurrencePattern,
};
use scheduling_cell::services::{AppointmentGenerationService, RecurrenceExpansionService};
use scheduling_cell::stores::AppointmentStore;

use common::{at, rule_fixture, InMemoryAppointmentStore};

#[tokio::test]
async fn test_conflicting_candidate_is_skipped_silently() {
    let store = Arc::new(InMemoryAppointmentStore::new());
    let rule = rule_fixture(
        RecurrencePattern::Daily,
        at(2030, 6, 1, 9, 0),
        at(2030, 6, 1, 9, 30),
        RecurrenceEnd::AfterOccurrences { count: 5 },
    );

    // Pre-existing booking colliding with the third candidate (June 3rd).
    store.seed(
        rule.professional_id,
        at(2030, 6, 3, 9, 0),
        at(2030, 6, 3, 10, 0),
        AppointmentStatus::Confirmed,
    );

    let candidates = RecurrenceExpansionService::new().expand(&rule);
    assert_eq!(candidates.len(), 5);

    let service = AppointmentGenerationService::new(Arc::clone(&store) as Arc<dyn AppointmentStore>);
    let report = service.generate_instances(&rule, &candidates, "token").await;

    assert_eq!(report.created_count(), 4);
    assert_eq!(report.skipped_count(), 1);
    assert_eq!(report.failed_count(), 0);

    let skipped_start = report
        .outcomes
        .iter()
        .find_map(|outcome| match outcome {
            CandidateOutcome::SkippedConflict { start_time, .. } => Some(*start_time),
            _ => None,
        })
        .unwrap();
    assert_eq!(skipped_start, at(2030, 6, 3, 9, 0));

    // The seeded booking plus the four generated instances.
    assert_eq!(store.all().len(), 5);
}

#[tokio::test]
async fn test_failed_insert_drops_only_that_candidate() {
    let store = Arc::new(InMemoryAppointmentStore::new());
    let rule = rule_fixture(
        RecurrencePattern::Daily,
        at(2030, 6, 1, 9, 0),
        at(2030, 6, 1, 9, 30),
        RecurrenceEnd::AfterOccurrences { count: 5 },
    );

    store.fail_inserts_starting_at(at(2030, 6, 2, 9, 0));

    let candidates = RecurrenceExpansionService::new().expand(&rule);
    let service = AppointmentGenerationService::new(Arc::clone(&store) as Arc<dyn AppointmentStore>);
    let report = service.generate_instances(&rule, &candidates, "token").await;

    assert_eq!(report.created_count(), 4);
    assert_eq!(report.skipped_count(), 0);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(store.all().len(), 4);
}

#[tokio::test]
async fn test_generated_instances_carry_rule_metadata() {
    let store = Arc::new(InMemoryAppointmentStore::new());
    let mut rule = rule_fixture(
        RecurrencePattern::Daily,
        at(2030, 6, 1, 9, 0),
        at(2030, 6, 1, 9, 30),
        RecurrenceEnd::AfterOccurrences { count: 3 },
    );
    rule.notes = Some("Bring previous lab results".to_string());
    rule.modified_by = Some(rule.patient_id);

    let candidates = RecurrenceExpansionService::new().expand(&rule);
    let service = AppointmentGenerationService::new(Arc::clone(&store) as Arc<dyn AppointmentStore>);
    let report = service.generate_instances(&rule, &candidates, "token").await;

    let created = report.created();
    assert_eq!(created.len(), 3);
    for appointment in created {
        assert_eq!(appointment.recurring_appointment_id, Some(rule.id));
        assert_eq!(appointment.status, AppointmentStatus::Confirmed);
        assert_eq!(appointment.patient_id, rule.patient_id);
        assert_eq!(appointment.professional_id, rule.professional_id);
        assert_eq!(appointment.notes.as_deref(), Some("Bring previous lab results"));
        assert_eq!(appointment.modified_by, rule.modified_by);
    }
}

#[tokio::test]
async fn test_generated_instances_block_each_other_within_a_batch() {
    // Two candidates landing on the same slot: the first insert wins, the
    // second is skipped by its own conflict check.
    let store = Arc::new(InMemoryAppointmentStore::new());
    let rule = rule_fixture(
        RecurrencePattern::Daily,
        at(2030, 6, 1, 9, 0),
        at(2030, 6, 1, 9, 30),
        RecurrenceEnd::AfterOccurrences { count: 2 },
    );

    let candidates = RecurrenceExpansionService::new().expand(&rule);
    let duplicated: Vec<_> = vec![candidates[0], candidates[0]];

    let service = AppointmentGenerationService::new(Arc::clone(&store) as Arc<dyn AppointmentStore>);
    let report = service.generate_instances(&rule, &duplicated, "token").await;

    assert_eq!(report.created_count(), 1);
    assert_eq!(report.skipped_count(), 1);
}
