use std::path::{Path, PathBuf};

use sspf::data::filter::{Diagnostic, Role};
use sspf::data::loader::load_table;
use sspf::data::model::{Dataset, Value};
use sspf::selection::{Fraction, SelectionEngine};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn trio() -> (Dataset, Dataset, Dataset) {
    (
        load_table(&fixture("test.csv")).expect("catalogue"),
        load_table(&fixture("testran.csv")).expect("random"),
        load_table(&fixture("testid.csv")).expect("ideal"),
    )
}

fn ids(ds: &Dataset) -> Vec<i64> {
    ds.column("ID")
        .expect("ID column")
        .map(|v| match v {
            Value::Integer(i) => *i,
            other => panic!("unexpected id {other:?}"),
        })
        .collect()
}

#[test]
fn redshift_and_type_cut_scores_fixture() {
    let (cat, ran, ideal) = trio();
    let result = SelectionEngine::default()
        .select(&cat, &ran, &ideal, &["z_gt_0.3", "type=ELG"])
        .expect("selection");

    assert_eq!(result.purity.value(), Some(0.75));
    assert_eq!(result.completeness.value(), Some(0.5));
    assert_eq!(ids(&result.catalogue), vec![101, 102, 105, 108, 110]);
    assert_eq!(result.random_selected, 4);
    assert_eq!(result.ideal_selected, 6);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn column_missing_from_random_only_warns_for_random() {
    let (cat, ran, ideal) = trio();
    let result = SelectionEngine::default()
        .select(&cat, &ran, &ideal, &["z_gt_0.3", "type=ELG", "Haflux_gt_8e-16"])
        .expect("selection");

    assert_eq!(
        result.diagnostics,
        vec![Diagnostic::MissingColumn {
            column: "Haflux".into(),
            raw: "Haflux_gt_8e-16".into(),
            role: Role::Random,
        }]
    );
    assert_eq!(ids(&result.catalogue), vec![101, 102, 108]);
    assert_eq!(result.random_selected, 4);
    assert_eq!(result.purity, Fraction::new(3, 4));
    assert_eq!(result.completeness, Fraction::new(3, 5));
    assert_eq!(result.completeness.value(), Some(0.6));
}

#[test]
fn unrecognized_criterion_changes_nothing() {
    let (cat, ran, ideal) = trio();
    let engine = SelectionEngine::default();
    let plain = engine
        .select(&cat, &ran, &ideal, &["z_gt_0.3", "type=ELG"])
        .expect("selection");
    let noisy = engine
        .select(&cat, &ran, &ideal, &["z>0.3", "z_gt_0.3", "type=ELG"])
        .expect("selection");

    assert_eq!(noisy.catalogue, plain.catalogue);
    assert_eq!(noisy.purity, plain.purity);
    assert_eq!(noisy.completeness, plain.completeness);
    assert_eq!(
        noisy.diagnostics,
        vec![Diagnostic::Unrecognized {
            raw: "z>0.3".into()
        }]
    );
}

#[test]
fn no_criteria_keeps_whole_catalogue() {
    let (cat, ran, ideal) = trio();
    let result = SelectionEngine::default()
        .select::<&str>(&cat, &ran, &ideal, &[])
        .expect("selection");

    assert_eq!(result.catalogue, cat);
    // Random ids 1..=10, ideal ids 1..=4 and 11..=16.
    assert_eq!(result.purity, Fraction::new(4, 10));
    assert_eq!(result.completeness, Fraction::new(4, 10));
}

#[test]
fn statistics_stay_within_unit_interval() {
    let (cat, ran, ideal) = trio();
    let engine = SelectionEngine::default();
    for criteria in [
        vec!["z_gt_0.5"],
        vec!["z_ls_0.5"],
        vec!["type=LRG"],
        vec!["type=QSO", "z_gt_0.3"],
        vec!["z_gt_0.3", "z_ls_0.65"],
    ] {
        let result = engine
            .select(&cat, &ran, &ideal, &criteria)
            .expect("selection");
        for stat in [result.purity, result.completeness] {
            if let Some(v) = stat.value() {
                assert!((0.0..=1.0).contains(&v), "{criteria:?} gave {stat}");
            }
        }
    }
}
