//! The restore pass every structural operation runs before persisting.
//!
//! Structural operations mutate one spot of the hierarchy; the functions here
//! then walk the whole affected collection so that numbering, ownership
//! references, date chaining and derived progress are all consistent again.
//! [`validate`] re-checks the result and refuses to let a broken aggregate
//! reach the store.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::cycle::PdlCycle;
use crate::error::{PdlError, Result};
use crate::phase::Phase;
use crate::project::{Project, Roadmap};
use crate::sprint::Sprint;
use crate::types::{PhaseStatus, SprintStatus};

// ---------------------------------------------------------------------------
// Numbering
// ---------------------------------------------------------------------------

/// Reset every sprint number to its 1-based array position.
pub fn renumber_sprints(sprints: &mut [Sprint]) {
    for (i, sprint) in sprints.iter_mut().enumerate() {
        sprint.sprint_number = i as u32 + 1;
    }
}

pub fn renumber_cycles(cycles: &mut [PdlCycle]) {
    for (i, cycle) in cycles.iter_mut().enumerate() {
        cycle.cycle_number = i as u32 + 1;
    }
}

/// Point every sprint at the phase that actually holds it.
pub fn relink_sprints(phase: &mut Phase) {
    for sprint in &mut phase.sprints {
        if sprint.phase_id != phase.id {
            sprint.phase_id = phase.id.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

pub fn phase_span(weeks: u32) -> Duration {
    Duration::days(i64::from(weeks) * 7)
}

/// End of a window of `weeks` starting at `start`, or `None` when it falls
/// outside the representable calendar.
pub fn window_end(start: DateTime<Utc>, weeks: u32) -> Option<DateTime<Utc>> {
    start.checked_add_signed(phase_span(weeks))
}

/// Chain phase windows in array order starting at `now`.
///
/// A completed phase with a recorded end date keeps its dates and moves the
/// cursor to that end date. Every other phase starts at the cursor and lasts
/// `duration_weeks`. A window past the end of the calendar is clamped there
/// and rejected by [`validate`].
pub fn recalculate_phase_dates(phases: &mut [Phase], now: DateTime<Utc>) {
    let mut cursor = now;
    for phase in phases.iter_mut() {
        if let (true, Some(end)) = (phase.is_date_anchor(), phase.end_date) {
            cursor = end;
            continue;
        }
        let end =
            window_end(cursor, phase.duration_weeks).unwrap_or(DateTime::<Utc>::MAX_UTC);
        phase.start_date = Some(cursor);
        phase.end_date = Some(end);
        cursor = end;
    }
}

// ---------------------------------------------------------------------------
// Derived fields
// ---------------------------------------------------------------------------

fn phase_completion(phase: &Phase) -> u8 {
    if phase.status == PhaseStatus::Completed {
        return 100;
    }
    let counted: Vec<&Sprint> = phase
        .sprints
        .iter()
        .filter(|s| s.status != SprintStatus::Cancelled)
        .collect();
    if counted.is_empty() {
        return phase.completion.min(100);
    }
    let done = counted
        .iter()
        .filter(|s| s.status == SprintStatus::Completed)
        .count();
    (done * 100 / counted.len()) as u8
}

pub fn recompute_progress(roadmap: &mut Roadmap) {
    for phase in &mut roadmap.phases {
        phase.completion = phase_completion(phase);
    }
    roadmap.overall_progress = if roadmap.phases.is_empty() {
        0
    } else {
        let total: u32 = roadmap.phases.iter().map(|p| u32::from(p.completion)).sum();
        let n = roadmap.phases.len() as u32;
        ((total + n / 2) / n) as u8
    };
    roadmap.start_date = roadmap.phases.first().and_then(|p| p.start_date);
    roadmap.end_date = roadmap.phases.last().and_then(|p| p.end_date);
}

// ---------------------------------------------------------------------------
// Restore
// ---------------------------------------------------------------------------

/// Full pass over the roadmap: ownership, numbering, velocity, dates, progress.
pub fn restore(project: &mut Project, now: DateTime<Utc>) {
    for phase in &mut project.roadmap.phases {
        relink_sprints(phase);
        renumber_sprints(&mut phase.sprints);
        for sprint in &mut phase.sprints {
            renumber_cycles(&mut sprint.cycles);
            sprint.velocity = sprint.completed_points();
        }
    }
    recalculate_phase_dates(&mut project.roadmap.phases, now);
    recompute_progress(&mut project.roadmap);
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn violation(msg: String) -> PdlError {
    PdlError::InvariantViolation(msg)
}

fn claim<'a>(ids: &mut HashSet<&'a str>, id: &'a str) -> Result<()> {
    if !ids.insert(id) {
        return Err(violation(format!("duplicate identifier '{id}'")));
    }
    Ok(())
}

/// Check numbering, ownership, identifier uniqueness and date chaining.
pub fn validate(project: &Project) -> Result<()> {
    let mut ids: HashSet<&str> = HashSet::new();
    let mut prev_end: Option<DateTime<Utc>> = None;

    for phase in &project.roadmap.phases {
        claim(&mut ids, &phase.id)?;

        if !phase.is_date_anchor() {
            let (Some(start), Some(end)) = (phase.start_date, phase.end_date) else {
                return Err(violation(format!(
                    "phase '{}' has no computed dates",
                    phase.phase_name
                )));
            };
            if window_end(start, phase.duration_weeks).is_none() {
                return Err(violation(format!(
                    "phase '{}' lasting {} weeks ends beyond the supported calendar",
                    phase.phase_name, phase.duration_weeks
                )));
            }
            if window_end(start, phase.duration_weeks) != Some(end) {
                return Err(violation(format!(
                    "phase '{}' window does not match its duration",
                    phase.phase_name
                )));
            }
            if let Some(prev) = prev_end {
                if start != prev {
                    return Err(violation(format!(
                        "phase '{}' starts at {start} but the previous phase ends at {prev}",
                        phase.phase_name
                    )));
                }
            }
        }
        prev_end = phase.end_date;

        for (i, sprint) in phase.sprints.iter().enumerate() {
            claim(&mut ids, &sprint.id)?;
            if sprint.sprint_number != i as u32 + 1 {
                return Err(violation(format!(
                    "sprint '{}' in phase '{}' is numbered {} at position {}",
                    sprint.sprint_name,
                    phase.phase_name,
                    sprint.sprint_number,
                    i + 1
                )));
            }
            if sprint.phase_id != phase.id {
                return Err(violation(format!(
                    "sprint '{}' references phase '{}' but lives in '{}'",
                    sprint.sprint_name, sprint.phase_id, phase.id
                )));
            }
            for (j, cycle) in sprint.cycles.iter().enumerate() {
                claim(&mut ids, &cycle.id)?;
                if cycle.cycle_number != j as u32 + 1 {
                    return Err(violation(format!(
                        "cycle {} of sprint '{}' is at position {}",
                        cycle.cycle_number,
                        sprint.sprint_name,
                        j + 1
                    )));
                }
                for task in &cycle.tasks {
                    claim(&mut ids, &task.id)?;
                }
            }
        }
    }
    for milestone in &project.roadmap.milestones {
        claim(&mut ids, &milestone.id)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reordering
// ---------------------------------------------------------------------------

/// Outcome of [`reorder_by_ids`].
#[derive(Debug)]
pub struct Reordering<T> {
    pub items: Vec<T>,
    /// Present in the collection but absent from the requested order.
    pub appended: Vec<String>,
    /// Requested but unknown, or repeated.
    pub ignored: Vec<String>,
}

/// Rebuild `items` in the order given by `order`.
///
/// Unknown or repeated identifiers are ignored. Items the order does not
/// mention keep their relative order and go to the end; nothing is dropped.
pub fn reorder_by_ids<T>(
    items: Vec<T>,
    order: &[String],
    id_of: impl Fn(&T) -> &str,
) -> Reordering<T> {
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let lookup: HashMap<String, usize> = slots
        .iter()
        .enumerate()
        .filter_map(|(i, slot)| slot.as_ref().map(|t| (id_of(t).to_string(), i)))
        .collect();

    let mut out = Vec::with_capacity(slots.len());
    let mut ignored = Vec::new();
    for id in order {
        match lookup.get(id.as_str()).and_then(|&i| slots[i].take()) {
            Some(item) => out.push(item),
            None => ignored.push(id.clone()),
        }
    }

    let mut appended = Vec::new();
    for item in slots.into_iter().flatten() {
        appended.push(id_of(&item).to_string());
        out.push(item);
    }

    Reordering {
        items: out,
        appended,
        ignored,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::PhaseSpec;
    use crate::sprint::SprintSpec;
    use chrono::TimeZone;

    fn phase(name: &str, weeks: u32) -> Phase {
        Phase::from_spec(
            PhaseSpec {
                phase_name: name.into(),
                duration_weeks: Some(weeks),
                ..Default::default()
            },
            2,
        )
    }

    fn sprint(name: &str, phase_id: &str) -> Sprint {
        Sprint::from_spec(
            SprintSpec {
                sprint_name: name.into(),
                goal: None,
            },
            phase_id,
        )
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap()
    }

    #[test]
    fn renumbering_is_positional_and_idempotent() {
        let mut sprints: Vec<Sprint> = ["a", "b", "c"].iter().map(|n| sprint(n, "p")).collect();
        sprints[0].sprint_number = 7;
        sprints[2].sprint_number = 7;

        renumber_sprints(&mut sprints);
        let once: Vec<u32> = sprints.iter().map(|s| s.sprint_number).collect();
        renumber_sprints(&mut sprints);
        let twice: Vec<u32> = sprints.iter().map(|s| s.sprint_number).collect();

        assert_eq!(once, [1, 2, 3]);
        assert_eq!(once, twice);
    }

    #[test]
    fn dates_chain_from_now() {
        let mut phases = vec![phase("A", 2), phase("B", 1), phase("C", 3)];
        recalculate_phase_dates(&mut phases, t0());

        assert_eq!(phases[0].start_date, Some(t0()));
        assert_eq!(phases[0].end_date, Some(t0() + Duration::days(14)));
        for pair in phases.windows(2) {
            assert_eq!(pair[1].start_date, pair[0].end_date);
        }
        assert_eq!(phases[2].end_date, Some(t0() + Duration::days(42)));
    }

    #[test]
    fn oversized_duration_is_clamped_then_rejected() {
        let mut project = Project::new("alpha");
        project.roadmap.phases = vec![phase("Forever", 100_000_000), phase("After", 1)];
        recalculate_phase_dates(&mut project.roadmap.phases, t0());

        assert_eq!(project.roadmap.phases[0].end_date, Some(DateTime::<Utc>::MAX_UTC));
        let err = validate(&project).unwrap_err();
        assert!(matches!(err, PdlError::InvariantViolation(_)));
        assert!(err.to_string().contains("Forever"));
    }

    #[test]
    fn completed_phase_anchors_the_chain() {
        let recorded_end = t0() - Duration::days(3);
        let mut done = phase("Done", 4);
        done.status = PhaseStatus::Completed;
        done.start_date = Some(recorded_end - Duration::days(10));
        done.end_date = Some(recorded_end);

        let mut phases = vec![phase("A", 1), done, phase("B", 2)];
        recalculate_phase_dates(&mut phases, t0());

        // The completed phase keeps its stored window.
        assert_eq!(phases[1].end_date, Some(recorded_end));
        assert_eq!(
            phases[1].start_date,
            Some(recorded_end - Duration::days(10))
        );
        // Chaining resumes from the recorded end, not from A's end.
        assert_eq!(phases[2].start_date, Some(recorded_end));
        assert_eq!(phases[2].end_date, Some(recorded_end + Duration::days(14)));
    }

    #[test]
    fn completed_phase_without_end_is_redated() {
        let mut done = phase("Done", 1);
        done.status = PhaseStatus::Completed;
        let mut phases = vec![done];
        recalculate_phase_dates(&mut phases, t0());
        assert_eq!(phases[0].start_date, Some(t0()));
    }

    #[test]
    fn restore_relinks_and_validates() {
        let mut project = Project::new("alpha");
        let mut a = phase("A", 2);
        a.sprints.push(sprint("S1", "stale-phase-id"));
        a.sprints.push(sprint("S2", "stale-phase-id"));
        project.roadmap.phases.push(a);

        assert!(validate(&project).is_err());
        restore(&mut project, t0());
        validate(&project).unwrap();

        let a = &project.roadmap.phases[0];
        assert!(a.sprints.iter().all(|s| s.phase_id == a.id));
        assert_eq!(a.sprints[1].sprint_number, 2);
    }

    #[test]
    fn validate_catches_gap_in_numbering() {
        let mut project = Project::new("alpha");
        let mut a = phase("A", 2);
        let id = a.id.clone();
        a.sprints.push(sprint("S1", &id));
        a.sprints.push(sprint("S2", &id));
        project.roadmap.phases.push(a);
        restore(&mut project, t0());

        project.roadmap.phases[0].sprints[1].sprint_number = 3;
        assert!(matches!(
            validate(&project),
            Err(PdlError::InvariantViolation(_))
        ));
    }

    #[test]
    fn validate_catches_duplicate_ids() {
        let mut project = Project::new("alpha");
        let a = phase("A", 1);
        let mut b = phase("B", 1);
        b.id = a.id.clone();
        project.roadmap.phases = vec![a, b];
        restore(&mut project, t0());

        let err = validate(&project).unwrap_err();
        assert!(err.to_string().contains("duplicate identifier"));
    }

    #[test]
    fn validate_catches_broken_chain() {
        let mut project = Project::new("alpha");
        project.roadmap.phases = vec![phase("A", 1), phase("B", 1)];
        restore(&mut project, t0());
        let b = &mut project.roadmap.phases[1];
        b.start_date = b.start_date.map(|d| d + Duration::days(1));
        b.end_date = b.end_date.map(|d| d + Duration::days(1));
        assert!(validate(&project).is_err());
    }

    #[test]
    fn progress_is_mean_of_phase_completion() {
        let mut project = Project::new("alpha");
        let mut a = phase("A", 1);
        a.status = PhaseStatus::Completed;
        let mut b = phase("B", 1);
        let bid = b.id.clone();
        let mut s1 = sprint("S1", &bid);
        s1.status = SprintStatus::Completed;
        let s2 = sprint("S2", &bid);
        let mut s3 = sprint("S3", &bid);
        s3.status = SprintStatus::Cancelled;
        b.sprints = vec![s1, s2, s3];
        project.roadmap.phases = vec![a, b];

        restore(&mut project, t0());
        assert_eq!(project.roadmap.phases[0].completion, 100);
        assert_eq!(project.roadmap.phases[1].completion, 50);
        assert_eq!(project.roadmap.overall_progress, 75);
        assert_eq!(project.roadmap.start_date, Some(t0()));
    }

    #[test]
    fn reorder_appends_omitted_and_ignores_unknown() {
        let items = vec!["a", "b", "c", "d"];
        let order: Vec<String> = ["c", "ghost", "a", "c"].iter().map(|s| s.to_string()).collect();
        let out = reorder_by_ids(items, &order, |s| *s);

        assert_eq!(out.items, ["c", "a", "b", "d"]);
        assert_eq!(out.appended, ["b", "d"]);
        assert_eq!(out.ignored, ["ghost", "c"]);
    }

    #[test]
    fn reorder_with_empty_order_keeps_everything() {
        let out = reorder_by_ids(vec!["x", "y"], &[], |s| *s);
        assert_eq!(out.items, ["x", "y"]);
        assert_eq!(out.appended.len(), 2);
    }
}
