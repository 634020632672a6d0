use rakeline_core::wire::ServerRecord;
use rakeline_core::{EditorRole, Position, RowField};
use rakeline_engine::ReconcileOutcome;
use rakeline_harness::fixtures::{counted_row, single_group_record, unit_key};
use rakeline_harness::{Endpoint, FakeBackend, TestEditor};
use rakeline_storage::DraftCache;

// ============================================================================
// Draft survival across reloads
// ============================================================================

#[test]
fn typed_values_survive_reload_while_counters_come_from_server() -> Result<(), Box<dyn std::error::Error>> {
    let mut record = single_group_record(2);
    record.rows[0] = counted_row(1, "W1", 3, Some(5), false);
    let server = FakeBackend::with_unit(unit_key(), record);
    let mut editor = TestEditor::new(server.clone(), EditorRole::Reviewer);

    let mut session = editor.enter(unit_key())?;
    let t = editor.advance(100);
    session.set_field(0, RowField::Remarks, "bay 4", t)?;
    let t = editor.advance(1_500);
    assert!(session.tick(t).draft_saved);

    // Loading progressed while the page was away.
    server.set_loaded(&unit_key(), 1, 5);
    let session = editor.reload(session, unit_key())?;

    assert_eq!(session.reconcile_outcome(), &ReconcileOutcome::MergedDraft);
    let row = &session.state().rows()[0];
    assert_eq!(row.remarks, "bay 4");
    assert_eq!(row.loaded_count, 5);
    assert!(row.complete, "5 >= 5 from the server, not the cached snapshot");
    assert!(session.is_dirty());
    Ok(())
}

#[test]
fn edits_inside_the_quiet_interval_are_lost_on_reload() -> Result<(), Box<dyn std::error::Error>> {
    let server = FakeBackend::with_unit(unit_key(), single_group_record(1));
    let mut editor = TestEditor::new(server, EditorRole::Operator);

    let mut session = editor.enter(unit_key())?;
    let t = editor.advance(10);
    session.set_field(0, RowField::Remarks, "typed", t)?;
    let t = editor.advance(500);
    assert!(!session.tick(t).draft_saved);

    let session = editor.reload(session, unit_key())?;
    assert_eq!(session.reconcile_outcome(), &ReconcileOutcome::ServerOnly);
    assert_eq!(session.state().rows()[0].remarks, "");
    Ok(())
}

#[test]
fn row_count_change_on_server_discards_draft() -> Result<(), Box<dyn std::error::Error>> {
    let server = FakeBackend::with_unit(unit_key(), single_group_record(2));
    let mut editor = TestEditor::new(server.clone(), EditorRole::Reviewer);

    let mut session = editor.enter(unit_key())?;
    session.set_field(1, RowField::Weight, "61.2", editor.now())?;
    session.flush_draft()?;
    editor.leave(session);

    server.put_unit(unit_key(), single_group_record(3));
    let session = editor.enter(unit_key())?;
    assert_eq!(
        session.reconcile_outcome(),
        &ReconcileOutcome::DiscardedConflict {
            cached_rows: 2,
            server_rows: 3
        }
    );
    assert_eq!(session.state().rows()[1].weight, "");
    assert!(session.cache().load(session.draft_key())?.is_none());
    Ok(())
}

#[test]
fn blank_draft_is_stale_and_cleared() -> Result<(), Box<dyn std::error::Error>> {
    let server = FakeBackend::with_unit(unit_key(), ServerRecord::default());
    let mut editor = TestEditor::new(server, EditorRole::Reviewer);

    let mut session = editor.enter(unit_key())?;
    session.set_field(0, RowField::Remarks, "x", editor.now())?;
    session.set_field(0, RowField::Remarks, "", editor.now())?;
    session.flush_draft()?;
    editor.leave(session);

    let session = editor.enter(unit_key())?;
    assert_eq!(session.reconcile_outcome(), &ReconcileOutcome::DiscardedStale);
    assert!(session.cache().keys()?.is_empty());
    Ok(())
}

#[test]
fn drafts_are_isolated_by_role() -> Result<(), Box<dyn std::error::Error>> {
    let server = FakeBackend::with_unit(unit_key(), single_group_record(1));
    let mut reviewer = TestEditor::new(server.clone(), EditorRole::Reviewer);

    let mut session = reviewer.enter(unit_key())?;
    session.set_field(0, RowField::Remarks, "reviewer note", reviewer.now())?;
    session.flush_draft()?;
    let (_, cache) = session.into_parts();

    // Same browser cache, different role.
    let mut operator = rakeline_engine::EditSession::open(
        server,
        cache,
        unit_key(),
        EditorRole::Operator,
        reviewer.config.clone(),
        reviewer.now(),
    )?;
    assert_eq!(operator.reconcile_outcome(), &ReconcileOutcome::ServerOnly);
    assert_eq!(operator.state().rows()[0].remarks, "");
    operator.close();
    Ok(())
}

#[test]
fn submitted_values_come_back_from_server_clean() -> Result<(), Box<dyn std::error::Error>> {
    let server = FakeBackend::with_unit(unit_key(), single_group_record(2));
    let mut editor = TestEditor::new(server, EditorRole::Reviewer);

    let mut session = editor.enter(unit_key())?;
    session.set_field(0, RowField::Commodity, "UREA", editor.now())?;
    session.flush_draft()?;
    session.save_draft()?;
    assert!(session.cache().load(session.draft_key())?.is_none());
    editor.leave(session);

    let session = editor.enter(unit_key())?;
    assert_eq!(session.reconcile_outcome(), &ReconcileOutcome::ServerOnly);
    assert!(!session.is_dirty());
    let commodities: Vec<&str> = session.state().rows().iter().map(|r| r.commodity.as_str()).collect();
    assert_eq!(commodities, vec!["UREA", "UREA"]);
    Ok(())
}

// ============================================================================
// Load failures
// ============================================================================

#[test]
fn load_failure_renders_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let server = FakeBackend::with_unit(unit_key(), single_group_record(1));
    server.fail(Endpoint::FetchUnit);
    let mut editor = TestEditor::new(server.clone(), EditorRole::Reviewer);

    let err = editor.enter(unit_key()).err().ok_or("expected a load failure")?;
    assert!(matches!(err, rakeline_engine::EngineError::Load(_)));
    assert!(err.to_string().contains(rakeline_harness::fixtures::UNIT_ID));

    server.recover(Endpoint::FetchUnit);
    assert!(editor.enter(unit_key()).is_ok());
    Ok(())
}

#[test]
fn draft_outlives_a_failed_load() -> Result<(), Box<dyn std::error::Error>> {
    let server = FakeBackend::with_unit(unit_key(), single_group_record(1));
    let mut editor = TestEditor::new(server.clone(), EditorRole::Reviewer);

    let mut session = editor.enter(unit_key())?;
    session.set_field(0, RowField::Remarks, "late arrival", editor.now())?;
    session.flush_draft()?;
    editor.leave(session);

    server.fail(Endpoint::FetchUnit);
    assert!(editor.enter(unit_key()).is_err());
    assert_eq!(editor.cache().ok_or("cache was lost")?.keys()?.len(), 1);

    server.recover(Endpoint::FetchUnit);
    let session = editor.enter(unit_key())?;
    assert_eq!(session.reconcile_outcome(), &ReconcileOutcome::MergedDraft);
    assert_eq!(session.state().rows()[0].remarks, "late arrival");
    Ok(())
}

// ============================================================================
// Override derivation
// ============================================================================

#[test]
fn manual_completion_is_recovered_from_server_mismatch() -> Result<(), Box<dyn std::error::Error>> {
    let mut record = single_group_record(3);
    record.rows[0] = counted_row(1, "W1", 1, Some(5), true);
    record.rows[1] = counted_row(2, "W2", 5, Some(5), true);
    record.rows[2] = counted_row(3, "W3", 2, None, true);
    let server = FakeBackend::with_unit(unit_key(), record);
    let mut editor = TestEditor::new(server, EditorRole::Reviewer);

    let session = editor.enter(unit_key())?;
    let overrides: Vec<Position> = session.state().manual_override().iter().copied().collect();
    assert_eq!(overrides, vec![Position::new(1)?, Position::new(3)?]);
    assert!(session.state().rows().iter().all(|r| r.complete));
    Ok(())
}
