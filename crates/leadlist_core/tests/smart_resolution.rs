mod common;

use common::{
    days_ago, insert_lead, list_service, membership_service, seed_leads, setup, ScriptedStore,
    NOW,
};
use leadlist_core::segment::catalog::DAY_MS;
use leadlist_core::{
    compile_criteria, operators_for, AddedBy, FieldClass, FixedClock, Lead, LeadField, LeadId,
    LeadList, ListKind, MembershipResolver, NewList, OperatorName, RecordStore, ResolutionError,
    Rule, SqliteRecordStore, ValidationError,
};
use std::collections::BTreeSet;
use uuid::Uuid;

fn smart_list(org: Uuid, criteria: Vec<Rule>) -> NewList {
    NewList {
        organization_id: org,
        name: "Segment".to_string(),
        description: None,
        kind: ListKind::Smart,
        criteria,
    }
}

fn names(members: &[leadlist_core::ResolvedMember]) -> BTreeSet<String> {
    members.iter().map(|member| member.lead.name.clone()).collect()
}

fn ids(members: &[leadlist_core::ResolvedMember]) -> BTreeSet<LeadId> {
    members.iter().map(|member| member.lead.id).collect()
}

#[test]
fn status_rule_selects_exactly_matching_leads() {
    let conn = setup();
    let clock = FixedClock::new(NOW);
    let service = list_service(&conn, &clock);
    let org = Uuid::new_v4();
    for (name, status) in [("a", "New"), ("b", "Qualified"), ("c", "Qualified"), ("d", "Lost")] {
        insert_lead(&conn, &Lead::new(org, name, NOW).with_status(status));
    }

    let list = service
        .create_list(smart_list(
            org,
            vec![Rule::new(LeadField::Status, OperatorName::Equals, "Qualified")],
        ))
        .unwrap();
    let members = service.resolve_membership(list.id).unwrap();

    assert_eq!(members.len(), 2);
    assert_eq!(names(&members), BTreeSet::from(["b".to_string(), "c".to_string()]));
}

#[test]
fn numeric_and_text_rules_combine_with_and() {
    let conn = setup();
    let clock = FixedClock::new(NOW);
    let service = list_service(&conn, &clock);
    let org = Uuid::new_v4();
    seed_leads(&conn, org);

    let list = service
        .create_list(smart_list(
            org,
            vec![
                Rule::new(LeadField::Score, OperatorName::GreaterEqual, "50"),
                Rule::new(LeadField::Source, OperatorName::Equals, "Referral"),
            ],
        ))
        .unwrap();
    let members = service.resolve_membership(list.id).unwrap();

    assert_eq!(
        names(&members),
        BTreeSet::from(["Ada".to_string(), "Cy".to_string()])
    );
}

#[test]
fn text_matching_ignores_case() {
    let conn = setup();
    let clock = FixedClock::new(NOW);
    let service = list_service(&conn, &clock);
    let org = Uuid::new_v4();
    seed_leads(&conn, org);

    let list = service
        .create_list(smart_list(
            org,
            vec![Rule::new(LeadField::Company, OperatorName::StartsWith, "ACME")],
        ))
        .unwrap();
    let members = service.resolve_membership(list.id).unwrap();

    assert_eq!(
        names(&members),
        BTreeSet::from(["Ada".to_string(), "Di".to_string()])
    );
}

#[test]
fn text_matching_folds_non_ascii_letters() {
    let conn = setup();
    let clock = FixedClock::new(NOW);
    let service = list_service(&conn, &clock);
    let org = Uuid::new_v4();
    insert_lead(&conn, &Lead::new(org, "müller", NOW).with_company("Équipe Müller"));
    insert_lead(&conn, &Lead::new(org, "other", NOW).with_company("Equipe Muller"));

    let list = service
        .create_list(smart_list(
            org,
            vec![Rule::new(LeadField::Company, OperatorName::Equals, "ÉQUIPE MÜLLER")],
        ))
        .unwrap();
    let members = service.resolve_membership(list.id).unwrap();
    assert_eq!(names(&members), BTreeSet::from(["müller".to_string()]));

    let suffix = service
        .create_list(smart_list(
            org,
            vec![Rule::new(LeadField::Name, OperatorName::EndsWith, "ÜLLER")],
        ))
        .unwrap();
    assert_eq!(service.resolve_membership(suffix.id).unwrap().len(), 1);
}

#[test]
fn missing_score_never_matches_numeric_rules() {
    let conn = setup();
    let clock = FixedClock::new(NOW);
    let service = list_service(&conn, &clock);
    let org = Uuid::new_v4();
    seed_leads(&conn, org);

    for operator in operators_for(FieldClass::Numeric) {
        let list = service
            .create_list(smart_list(
                org,
                vec![Rule::new(LeadField::Score, *operator, "0")],
            ))
            .unwrap();
        let members = service.resolve_membership(list.id).unwrap();
        assert!(
            !names(&members).contains("Di"),
            "unscored lead matched `score {operator} 0`"
        );
    }
}

#[test]
fn store_query_agrees_with_in_memory_evaluation() {
    let conn = setup();
    let org = Uuid::new_v4();
    let mut seeded = seed_leads(&conn, org);
    let accented = Lead::new(org, "Zoë Ångström", days_ago(3))
        .with_status("QUALIFIÉ")
        .with_company("Équipe Müller")
        .with_email("zoe@équipe.example");
    insert_lead(&conn, &accented);
    seeded.push(accented);
    let store = SqliteRecordStore::try_new(&conn).unwrap();

    let mut checked = 0;
    for field in LeadField::ALL {
        for operator in operators_for(field.class()) {
            let values: &[&str] = match (field.class(), operator) {
                (FieldClass::Text, _) => &[
                    "acme",
                    "Qualified",
                    "re",
                    "io",
                    "",
                    "ÉQUIPE MÜLLER",
                    "müller",
                    "qualifié",
                    "ÅNGSTRÖM",
                ],
                (FieldClass::Numeric, _) => &["49", "50", "79.5", "80"],
                (FieldClass::Date, OperatorName::InLastDays) => &["0", "2", "5", "30"],
                (FieldClass::Date, _) => &[
                    "2024-07-01",
                    "2024-03-01",
                    "2024-07-02T09:46:40Z",
                    "1719827200000",
                ],
            };
            for value in values {
                let rules = vec![Rule::new(field, *operator, *value)];
                let predicate = compile_criteria(org, &rules, NOW).unwrap();

                let from_store = store
                    .query_leads(&predicate)
                    .unwrap()
                    .into_iter()
                    .map(|lead| lead.id)
                    .collect::<BTreeSet<_>>();
                let in_memory = seeded
                    .iter()
                    .filter(|lead| predicate.matches(lead))
                    .map(|lead| lead.id)
                    .collect::<BTreeSet<_>>();

                assert_eq!(
                    from_store, in_memory,
                    "store and in-memory disagree on `{field} {operator} {value:?}`"
                );
                checked += 1;
            }
        }
    }
    assert!(checked > 100);
}

#[test]
fn conjunction_is_intersection_and_narrows_monotonically() {
    let conn = setup();
    let clock = FixedClock::new(NOW);
    let service = list_service(&conn, &clock);
    let org = Uuid::new_v4();
    seed_leads(&conn, org);

    let referral = Rule::new(LeadField::Source, OperatorName::Equals, "referral");
    let recent = Rule::new(LeadField::CreatedAt, OperatorName::InLastDays, "30");
    let scored = Rule::new(LeadField::Score, OperatorName::GreaterThan, "49");

    let resolve = |criteria: Vec<Rule>| {
        let list = service.create_list(smart_list(org, criteria)).unwrap();
        ids(&service.resolve_membership(list.id).unwrap())
    };

    let only_referral = resolve(vec![referral.clone()]);
    let only_recent = resolve(vec![recent.clone()]);
    let both = resolve(vec![referral.clone(), recent.clone()]);
    let intersection = only_referral
        .intersection(&only_recent)
        .copied()
        .collect::<BTreeSet<_>>();
    assert_eq!(both, intersection);

    let narrowed = resolve(vec![referral, recent, scored]);
    assert!(narrowed.is_subset(&both));
    assert_eq!(narrowed.len(), 1);
}

#[test]
fn relative_date_rule_follows_the_clock() {
    let conn = setup();
    let clock = FixedClock::new(NOW);
    let service = list_service(&conn, &clock);
    let org = Uuid::new_v4();
    for day in 0..=10 {
        insert_lead(&conn, &Lead::new(org, format!("lead-{day}"), days_ago(day)));
    }

    let list = service
        .create_list(smart_list(
            org,
            vec![Rule::new(LeadField::CreatedAt, OperatorName::InLastDays, "5")],
        ))
        .unwrap();
    assert_eq!(service.resolve_membership(list.id).unwrap().len(), 6);

    clock.advance(2 * DAY_MS);
    assert_eq!(service.resolve_membership(list.id).unwrap().len(), 4);
}

#[test]
fn resolution_is_scoped_to_the_list_organization() {
    let conn = setup();
    let clock = FixedClock::new(NOW);
    let service = list_service(&conn, &clock);
    let org = Uuid::new_v4();
    let other_org = Uuid::new_v4();
    seed_leads(&conn, org);
    seed_leads(&conn, other_org);

    let list = service
        .create_list(smart_list(
            org,
            vec![Rule::new(LeadField::Name, OperatorName::Equals, "Ada")],
        ))
        .unwrap();
    let members = service.resolve_membership(list.id).unwrap();

    assert_eq!(members.len(), 1);
    assert_eq!(members[0].lead.organization_id, org);
}

#[test]
fn smart_members_are_synthetic_and_ordered_by_lead_id() {
    let conn = setup();
    let clock = FixedClock::new(NOW);
    let service = list_service(&conn, &clock);
    let org = Uuid::new_v4();
    seed_leads(&conn, org);

    let list = service
        .create_list(smart_list(
            org,
            vec![Rule::new(LeadField::Status, OperatorName::NotEquals, "Lost")],
        ))
        .unwrap();
    let members = service.resolve_membership(list.id).unwrap();

    assert_eq!(members.len(), 4);
    for member in &members {
        assert_eq!(member.added_by, AddedBy::SmartRule);
        assert_eq!(member.membership_id, None);
        assert_eq!(member.added_at, member.lead.created_at);
    }
    let order = members.iter().map(|member| member.lead.id).collect::<Vec<_>>();
    let mut sorted = order.clone();
    sorted.sort();
    assert_eq!(order, sorted);
}

#[test]
fn static_members_carry_their_membership_rows() {
    let conn = setup();
    let clock = FixedClock::new(NOW);
    let service = list_service(&conn, &clock);
    let org = Uuid::new_v4();
    let seeded = seed_leads(&conn, org);
    let list = service
        .create_list(NewList {
            kind: ListKind::Static,
            ..smart_list(org, Vec::new())
        })
        .unwrap();

    let members_service =
        membership_service(&conn, SqliteRecordStore::try_new(&conn).unwrap(), &clock);
    let membership_id = members_service
        .add_member(list.id, seeded[2].id, "alice")
        .unwrap();

    let members = service.resolve_membership(list.id).unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].lead, seeded[2]);
    assert_eq!(members[0].membership_id, Some(membership_id));
    assert_eq!(members[0].added_by, AddedBy::User("alice".to_string()));
    assert_eq!(members[0].added_at, NOW);
}

#[test]
fn empty_static_list_resolves_to_no_members() {
    let conn = setup();
    let clock = FixedClock::new(NOW);
    let service = list_service(&conn, &clock);
    let org = Uuid::new_v4();
    seed_leads(&conn, org);
    let list = service
        .create_list(NewList {
            kind: ListKind::Static,
            ..smart_list(org, Vec::new())
        })
        .unwrap();

    assert!(service.resolve_membership(list.id).unwrap().is_empty());
}

#[test]
fn store_failure_is_not_an_empty_result() {
    let conn = setup();
    let clock = FixedClock::new(NOW);
    let org = Uuid::new_v4();
    seed_leads(&conn, org);
    let list = list_service(&conn, &clock)
        .create_list(smart_list(
            org,
            vec![Rule::new(LeadField::Name, OperatorName::Equals, "nobody")],
        ))
        .unwrap();

    let healthy = MembershipResolver::new(SqliteRecordStore::try_new(&conn).unwrap(), &clock);
    assert!(healthy.resolve(&list).unwrap().is_empty());

    let failing = MembershipResolver::new(
        ScriptedStore::new(SqliteRecordStore::try_new(&conn).unwrap()).failing_queries(),
        &clock,
    );
    let err = failing.resolve(&list).unwrap_err();
    assert!(matches!(err, ResolutionError::StoreUnavailable(_)));
    assert!(err.to_string().starts_with("could not load members"));
}

#[test]
fn corrupt_criteria_and_missing_lists_are_errors() {
    let conn = setup();
    let clock = FixedClock::new(NOW);
    let service = list_service(&conn, &clock);
    let org = Uuid::new_v4();

    let missing = Uuid::new_v4();
    assert!(matches!(
        service.resolve_membership(missing),
        Err(ResolutionError::ListNotFound(id)) if id == missing
    ));

    let corrupt = LeadList {
        id: Uuid::new_v4(),
        organization_id: org,
        name: "Broken".to_string(),
        description: None,
        kind: ListKind::Smart,
        criteria: vec![Rule::new(LeadField::Score, OperatorName::Contains, "8")],
        created_at: NOW,
        updated_at: NOW,
    };
    assert!(matches!(
        service.resolve_list(&corrupt),
        Err(ResolutionError::InvalidCriteria(
            ValidationError::InvalidOperatorForField { .. }
        ))
    ));
}
