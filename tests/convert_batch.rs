// tests/convert_batch.rs

//! End-to-end conversion batches over the mock host.
//!
//! These tests verify:
//! 1. The documented mixed-batch scenario (one valid unit, one with an
//!    unsupported parameter)
//! 2. All-or-nothing: a lost commit reverts every unit, including prior
//!    per-unit successes
//! 3. Round-trip conversion preserves the non-relocated call signature
//! 4. Best-effort side effects (storage removal, editor open) degrade
//!    silently without affecting outcomes

use unitconv::host::mock::{definition, MockProject};
use unitconv::{
    BatchCoordinator, ConversionPolicy, FailureReason, HostVersion, InvocationTrace, Outcome,
    ReturnRelocation, Section, StaticRelocation, UnitHandle, UnitInterface, UnitKind, Variable,
};

fn motor_interface(extra: Option<Variable>) -> UnitInterface {
    let mut variables = vec![
        Variable::new("speed", "Int", Section::Input),
        Variable::new("running", "Bool", Section::Output),
        Variable::new("count", "DInt", Section::Static),
    ];
    if let Some(var) = extra {
        variables.push(var);
    }
    UnitInterface::new(variables)
}

fn run(
    project: &MockProject,
    handles: &[UnitHandle],
    policy: &ConversionPolicy,
) -> unitconv::BatchReport {
    BatchCoordinator::new(policy)
        .convert_all(project, &project.select(handles), &mut InvocationTrace::disabled())
        .unwrap()
}

#[test]
fn test_mixed_batch_commits_successes_and_reports_only_failures() {
    // selection = [Motor1 (valid), Motor2 (unsupported parameter kind)],
    // policy = statics to temp
    let project = MockProject::new(HostVersion(17));
    let motor1 = project.add_unit(definition(
        "Motor1",
        UnitKind::Stateful,
        motor_interface(None),
        "#Static.count := #Static.count + 1;",
    ));
    let motor2 = project.add_unit(definition(
        "Motor2",
        UnitKind::Stateful,
        motor_interface(Some(Variable::new("inst", "Instance", Section::InOut))),
        "",
    ));

    let policy = ConversionPolicy {
        static_relocation: StaticRelocation::ToTempVariable,
        ..Default::default()
    };
    let report = run(&project, &[motor1, motor2], &policy);

    // Motor1 converted and persisted
    assert!(report.committed);
    let converted = project.unit_by_name("Motor1").unwrap();
    assert_eq!(converted.kind, UnitKind::Stateless);
    let count = converted
        .interface
        .variables
        .iter()
        .find(|v| v.name == "count")
        .unwrap();
    assert_eq!(count.section, Section::Temp);
    assert_eq!(converted.body, "#count := #count + 1;");

    // Motor2 unchanged, reported with the stable reason/action pair
    assert_eq!(project.unit_by_name("Motor2").unwrap().kind, UnitKind::Stateful);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].name, "Motor2");
    assert_eq!(
        failures[0].outcome,
        Outcome::Failed {
            reason: FailureReason::UnsupportedInterfaceElement
        }
    );
    assert!(report
        .failure_message()
        .contains("Remove or change the unsupported parameter before converting"));
    assert!(!report.failure_message().contains("Motor1"));
}

#[test]
fn test_lost_commit_reverts_all_three_units() {
    let project = MockProject::new(HostVersion(17));
    let handles: Vec<_> = (1..=3)
        .map(|i| {
            project.add_unit(definition(
                &format!("Motor{i}"),
                UnitKind::Stateful,
                motor_interface(None),
                "#Static.count := 0;",
            ))
        })
        .collect();

    // Unit 2 (and the others) succeed their rewrite, but the host then
    // reports the work as uncommittable.
    project.invalidate_commit();

    let policy = ConversionPolicy::default();
    let report = run(&project, &handles, &policy);

    assert_eq!(report.succeeded_count(), 3);
    assert!(!report.committed);
    assert!(report.batch_failure.is_some());
    for i in 1..=3 {
        let unit = project.unit_by_name(&format!("Motor{i}")).unwrap();
        assert_eq!(unit.kind, UnitKind::Stateful);
        assert_eq!(unit.body, "#Static.count := 0;");
    }
}

#[test]
fn test_round_trip_preserves_call_signature() {
    let project = MockProject::new(HostVersion(17));
    let handle = project.add_unit(definition(
        "Scale",
        UnitKind::Stateless,
        UnitInterface::new(vec![
            Variable::new("raw", "Int", Section::Input),
            Variable::new("offset", "Int", Section::Input),
            Variable::new("scaled", "Real", Section::Output),
            Variable::new("Ret_Val", "Real", Section::Return),
        ]),
        "#Ret_Val := (#raw + #offset) * 1.0;",
    ));

    let original_params: Vec<_> = project
        .unit_by_name("Scale")
        .unwrap()
        .interface
        .parameters()
        .cloned()
        .collect();

    // stateless -> stateful with return-to-output
    let to_stateful = ConversionPolicy {
        return_relocation: ReturnRelocation::ToOutputParameter,
        ..Default::default()
    };
    assert!(run(&project, &[handle], &to_stateful).committed);
    assert_eq!(project.unit_by_name("Scale").unwrap().kind, UnitKind::Stateful);
    assert!(project.has_storage("Scale"));

    // and back with statics-to-inout
    let to_stateless = ConversionPolicy {
        static_relocation: StaticRelocation::ToInOutParameter,
        ..Default::default()
    };
    assert!(run(&project, &[handle], &to_stateless).committed);

    let round_tripped = project.unit_by_name("Scale").unwrap();
    assert_eq!(round_tripped.kind, UnitKind::Stateless);
    let params: Vec<_> = round_tripped
        .interface
        .parameters()
        .filter(|v| v.name != "Ret_Val")
        .cloned()
        .collect();
    assert_eq!(params, original_params);
}

#[test]
fn test_storage_removal_respects_other_callers() {
    let project = MockProject::new(HostVersion(17));
    let referenced = project.add_unit(definition(
        "Shared",
        UnitKind::Stateful,
        motor_interface(None),
        "",
    ));
    let unreferenced = project.add_unit(definition(
        "Private",
        UnitKind::Stateful,
        motor_interface(None),
        "",
    ));
    project.set_storage_refs("Shared", 3);

    let policy = ConversionPolicy {
        remove_auxiliary_storage: true,
        ..Default::default()
    };
    let report = run(&project, &[referenced, unreferenced], &policy);

    // Both conversions succeed; the unsafe removal degrades to a note
    assert!(report.committed);
    assert_eq!(report.succeeded_count(), 2);
    assert!(project.has_storage("Shared"));
    assert!(!project.has_storage("Private"));

    let shared = report.units.iter().find(|u| u.name == "Shared").unwrap();
    match &shared.outcome {
        Outcome::Succeeded { notes } => {
            assert_eq!(notes.len(), 1);
            assert!(notes[0].contains("still referenced"));
        }
        other => panic!("expected success with note, got {other:?}"),
    }
}

#[test]
fn test_editor_open_failure_silently_degrades() {
    let project = MockProject::new(HostVersion(17));
    let handle = project.add_unit(definition(
        "Motor1",
        UnitKind::Stateful,
        motor_interface(None),
        "",
    ));
    project.fail_editor_opens();

    let policy = ConversionPolicy {
        open_result_in_editor: true,
        ..Default::default()
    };
    let report = run(&project, &[handle], &policy);

    assert!(report.committed);
    assert!(!report.needs_report());
    let unit = &report.units[0];
    // Editor failure leaves no trace on the outcome at all
    assert_eq!(unit.outcome, Outcome::Succeeded { notes: vec![] });
    assert!(project.editor_opened().is_empty());
}

#[test]
fn test_editor_opened_for_each_converted_unit() {
    let project = MockProject::new(HostVersion(17));
    let handle = project.add_unit(definition(
        "Motor1",
        UnitKind::Stateful,
        motor_interface(None),
        "",
    ));

    let policy = ConversionPolicy {
        open_result_in_editor: true,
        ..Default::default()
    };
    run(&project, &[handle], &policy);

    assert_eq!(project.editor_opened(), ["Motor1"]);
}

#[test]
fn test_incompatible_host_version_fails_every_unit() {
    let project = MockProject::new(HostVersion(14));
    let handle = project.add_unit(definition(
        "Motor1",
        UnitKind::Stateful,
        motor_interface(None),
        "",
    ));

    let report = run(&project, &[handle], &ConversionPolicy::default());

    assert!(!report.committed);
    assert_eq!(
        report.units[0].outcome,
        Outcome::Failed {
            reason: FailureReason::HostVersionIncompatible
        }
    );
}

#[test]
fn test_trace_file_kept_only_when_written() {
    let project = MockProject::new(HostVersion(17));
    let handle = project.add_unit(definition(
        "Motor1",
        UnitKind::Stateful,
        motor_interface(None),
        "",
    ));

    let temp = tempfile::TempDir::new().unwrap();
    let mut trace = InvocationTrace::create(temp.path()).unwrap();
    let path = trace.path().unwrap().to_path_buf();

    BatchCoordinator::new(&ConversionPolicy::default())
        .convert_all(&project, &project.select(&[handle]), &mut trace)
        .unwrap();
    trace.finish().unwrap();

    // The batch wrote records, so the file stays
    assert!(path.exists());
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("Motor1"));
}
