//! End-to-end request handling against an on-disk SQLite store.
//!
//! Graph used throughout:
//!
//! - Alice (1) may edit Bob (2)
//! - Carol (3) has an edge to Bob that lets Bob edit Carol
//! - Dave (4) is unrelated
//! - Erin (5) may edit Alice, but the grant expired yesterday
//!
//! Events: 10 owned by Bob, 20 owned by Carol, 30 owned by Dave, 42 unowned.

use chrono::NaiveDate;
use relacl::core::{AttributeDescriptor, EntityId, HostUserId, PartyId, RelationshipEdge};
use relacl::store::{SqliteStore, Store};
use relacl::{AclConfig, AclError, RelAcl, RequestKind, ResourceKind};
use tempfile::TempDir;

const ALICE: PartyId = PartyId::new(1);
const BOB: PartyId = PartyId::new(2);
const CAROL: PartyId = PartyId::new(3);
const DAVE: PartyId = PartyId::new(4);
const ERIN: PartyId = PartyId::new(5);

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 2).unwrap()
}

fn yesterday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

fn e(id: i64) -> EntityId {
    EntityId::new(id)
}

fn setup() -> anyhow::Result<(TempDir, RelAcl<SqliteStore>)> {
    init_tracing();
    let dir = TempDir::new()?;
    let store = SqliteStore::open(dir.path().join("relacl.db"))?;

    for party in [ALICE, BOB, CAROL, DAVE, ERIN] {
        store.insert_party(party)?;
    }
    store.insert_relationship(&RelationshipEdge::new(ALICE, BOB).permit_a_to_b())?;
    store.insert_relationship(&RelationshipEdge::new(CAROL, BOB).permit_b_to_a())?;
    store.insert_relationship(
        &RelationshipEdge::new(ERIN, ALICE)
            .permit_a_to_b()
            .between(None, Some(yesterday())),
    )?;

    store.map_user(HostUserId::new(100), ALICE)?;
    store.map_user(HostUserId::new(400), DAVE)?;

    let descriptor = AttributeDescriptor::new("event_owner", "owner_party")?;
    store.register_attribute("Event owner", &descriptor)?;

    // Participants: 101 at event 10, 201 at event 20, 301 at event 30
    store.insert_participant(e(101), e(10), DAVE)?;
    store.insert_participant(e(201), e(20), BOB)?;
    store.insert_participant(e(301), e(30), CAROL)?;
    // Contributions paying for those participants
    store.insert_participant_payment(e(101), e(1001))?;
    store.insert_participant_payment(e(301), e(3001))?;

    let acl = RelAcl::new(store, AclConfig::default());
    assert!(acl
        .admin()
        .save_config_row("event_owner_attribute", "Event owner")
        .is_ok());

    let owners = acl.attribute_store(relacl::core::AttributeRef::name("Event owner"))?;
    owners.upsert(e(10), BOB.get())?;
    owners.upsert(e(20), CAROL.get())?;
    owners.upsert(e(30), DAVE.get())?;

    Ok((dir, acl))
}

#[test]
fn test_event_listing_follows_closure() -> anyhow::Result<()> {
    let (_dir, acl) = setup()?;
    let request = acl.begin_request(HostUserId::new(100), today())?;

    let rows = vec![(e(30), "dave"), (e(20), "carol"), (e(42), "open"), (e(10), "bob")];
    let visible = request.filter(&RequestKind::ManageEvents, rows)?;

    assert_eq!(visible, vec![(e(20), "carol"), (e(42), "open"), (e(10), "bob")]);
    Ok(())
}

#[test]
fn test_closure_needs_two_rounds() -> anyhow::Result<()> {
    let (_dir, acl) = setup()?;
    let request = acl.begin_request_for_party(ALICE, today());

    let closure = request.allowed_parties()?;
    assert!(closure.contains(BOB));
    assert!(closure.contains(CAROL));
    assert!(closure.contains(ALICE));
    assert!(!closure.contains(DAVE));
    Ok(())
}

#[test]
fn test_expired_grant_only_counts_on_its_last_day() -> anyhow::Result<()> {
    let (_dir, acl) = setup()?;

    let past = acl.begin_request_for_party(ERIN, yesterday());
    assert!(past.allowed_parties()?.contains(CAROL));
    assert!(past.is_allowed(ResourceKind::Event, e(20))?);

    let now = acl.begin_request_for_party(ERIN, today());
    assert_eq!(now.allowed_parties()?.len(), 1);
    assert!(!now.is_allowed(ResourceKind::Event, e(20))?);
    Ok(())
}

#[test]
fn test_unowned_event_visible_to_everyone() -> anyhow::Result<()> {
    let (_dir, acl) = setup()?;

    for user in [100, 400, 999] {
        let request = acl.begin_request(HostUserId::new(user), today())?;
        let visible = request.filter(&RequestKind::EventDashboard, vec![(e(42), ())])?;
        assert_eq!(visible.len(), 1, "user {} lost the unowned event", user);
    }
    Ok(())
}

#[test]
fn test_unmapped_user_sees_only_unowned() -> anyhow::Result<()> {
    let (_dir, acl) = setup()?;
    let request = acl.begin_request(HostUserId::new(999), today())?;

    assert!(request.party().is_none());
    let visible = request.filter(
        &RequestKind::EventReport,
        vec![(e(10), ()), (e(20), ()), (e(42), ())],
    )?;
    assert_eq!(visible, vec![(e(42), ())]);
    Ok(())
}

#[test]
fn test_edit_gates() -> anyhow::Result<()> {
    let (_dir, acl) = setup()?;
    let request = acl.begin_request(HostUserId::new(100), today())?;

    request.authorize(&RequestKind::EditEvent(e(10)))?;
    request.authorize(&RequestKind::EditParticipant(e(201)))?;

    match request.authorize(&RequestKind::EditEvent(e(30))) {
        Err(AclError::AccessDenied { resource, id }) => {
            assert_eq!(resource, ResourceKind::Event);
            assert_eq!(id, e(30));
        }
        other => panic!("expected AccessDenied, got {:?}", other),
    }

    // Contribution 3001 pays for participant 301 at Dave's event
    assert!(matches!(
        request.authorize(&RequestKind::EditContribution(e(3001))),
        Err(AclError::AccessDenied { .. })
    ));
    Ok(())
}

#[test]
fn test_contribution_tab_resolves_through_chain() -> anyhow::Result<()> {
    let (_dir, acl) = setup()?;
    let request = acl.begin_request(HostUserId::new(100), today())?;

    // 1001 -> participant 101 -> event 10 (Bob): visible
    // 3001 -> participant 301 -> event 30 (Dave): hidden
    // 5001 has no payment row: kept
    let mut rows = std::collections::BTreeMap::from([
        (e(1001), "gala ticket"),
        (e(3001), "dinner"),
        (e(5001), "donation"),
    ]);
    request.retain(&RequestKind::ContactContributionsTab, &mut rows)?;

    assert_eq!(rows.keys().copied().collect::<Vec<_>>(), vec![e(1001), e(5001)]);
    Ok(())
}

#[test]
fn test_dashboards_and_contact_summary() -> anyhow::Result<()> {
    let (_dir, acl) = setup()?;
    let request = acl.begin_request(HostUserId::new(100), today())?;

    let recent = vec![(e(3001), "dinner"), (e(1001), "gala ticket")];
    let kept = request.filter(&RequestKind::ContributionDashboard, recent)?;
    assert_eq!(kept, vec![(e(1001), "gala ticket")]);

    // Activity feed rows keyed by participant id
    let activities = vec![(e(101), "registered"), (e(201), "attended"), (e(301), "registered")];
    let kept = request.filter(&RequestKind::ContactSummary, activities)?;
    assert_eq!(kept, vec![(e(101), "registered"), (e(201), "attended")]);
    Ok(())
}

#[test]
fn test_participant_search_filters_by_party() -> anyhow::Result<()> {
    let (_dir, acl) = setup()?;
    let request = acl.begin_request(HostUserId::new(100), today())?;

    let mut rows = vec![(e(101), DAVE), (e(201), BOB), (e(301), CAROL)];
    request.retain_parties(&mut rows, |row| row.1)?;

    assert_eq!(rows, vec![(e(201), BOB), (e(301), CAROL)]);
    Ok(())
}

#[test]
fn test_owner_attribute_by_id() -> anyhow::Result<()> {
    let (_dir, acl) = setup()?;
    let descriptor = AttributeDescriptor::new("event_owner", "owner_party")?;
    let field = acl.store().register_attribute("Event owner", &descriptor)?;

    assert!(acl
        .admin()
        .save_config_row("event_owner_attribute", &field.to_string())
        .is_ok());
    let request = acl.begin_request(HostUserId::new(400), today())?;
    assert!(request.is_allowed(ResourceKind::Event, e(30))?);
    assert!(!request.is_allowed(ResourceKind::Event, e(10))?);
    Ok(())
}

#[test]
fn test_deleted_owner_config_blocks_filtering() -> anyhow::Result<()> {
    let (_dir, acl) = setup()?;
    assert_eq!(
        acl.admin().delete_config_row("event_owner_attribute").to_body(),
        "ok"
    );

    let request = acl.begin_request(HostUserId::new(100), today())?;
    let err = request
        .filter(&RequestKind::ManageEvents, vec![(e(42), ())])
        .unwrap_err();
    assert!(matches!(err, AclError::ConfigurationMissing(_)));
    Ok(())
}

#[test]
fn test_config_survives_reopen() -> anyhow::Result<()> {
    let (dir, acl) = setup()?;
    drop(acl);

    let store = SqliteStore::open(dir.path().join("relacl.db"))?;
    let acl = RelAcl::new(store, AclConfig::default());
    assert_eq!(
        acl.admin().get_config().to_body(),
        r#"{"event_owner_attribute":"Event owner"}"#
    );

    let request = acl.begin_request(HostUserId::new(100), today())?;
    assert!(request.is_allowed(ResourceKind::Event, e(20))?);
    Ok(())
}

#[test]
fn test_excluding_seed_hides_own_events() -> anyhow::Result<()> {
    let (_dir, acl) = setup()?;
    let store = acl.store();
    let owners = acl.attribute_store(relacl::core::AttributeRef::name("Event owner"))?;
    owners.upsert(e(50), ALICE.get())?;

    let config = AclConfig {
        include_seed: false,
        ..AclConfig::default()
    };
    let request = relacl::RequestContext::new(store, &config, Some(ALICE), today());
    assert!(!request.is_allowed(ResourceKind::Event, e(50))?);

    let request = acl.begin_request_for_party(ALICE, today());
    assert!(request.is_allowed(ResourceKind::Event, e(50))?);
    Ok(())
}
