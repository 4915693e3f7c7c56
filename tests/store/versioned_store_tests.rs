//! VersionedStore interface tests.
//!
//! These tests verify the contract of the VersionedStore trait. They share
//! one database, so every test uses its own record names.

use serde_json::{json, Value};

use orchestrix::catalog::Stores;
use orchestrix::entity::{
    HostAttributes, NewRecord, Patch, Record, TenantAttributes, UserAttributes, UserState,
};
use orchestrix::entity::{Entity, Host};
use orchestrix::store::{kinds, SearchQuery, StoreError};

/// Create-view payload for a tenant.
pub fn tenant(name: &str) -> NewRecord<TenantAttributes> {
    NewRecord::new(name, TenantAttributes {})
}

/// Create-view payload for a host under `tenant_urn`.
pub fn host(name: &str, tenant_urn: &str, ip: &str) -> NewRecord<HostAttributes> {
    NewRecord::new(
        name,
        HostAttributes {
            ip: ip.to_string(),
            tenant_urn: tenant_urn.to_string(),
        },
    )
}

pub fn user(name: &str, tenant_urn: Option<&str>, email: &str) -> NewRecord<UserAttributes> {
    NewRecord::new(
        name,
        UserAttributes {
            tenant_urn: tenant_urn.map(String::from),
            username: name.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$v=19$m=65536,t=3,p=4$c2FsdA$aGFzaA".to_string(),
            state: UserState::Active,
        },
    )
}

/// Patch from a JSON object literal.
pub fn patch<E: Entity>(value: Value) -> Patch<E> {
    match value {
        Value::Object(map) => Patch::new(map),
        other => panic!("patch must be an object, got {}", other),
    }
}

fn assert_validation(err: StoreError, field: &str, kind: &str) {
    match err {
        StoreError::Validation(errors) => {
            assert!(
                errors
                    .iter()
                    .any(|e| e.loc.last().map(String::as_str) == Some(field) && e.kind == kind),
                "expected {} error on {}, got {:?}",
                kind,
                field,
                errors
            );
        }
        other => panic!("expected validation error, got {:?}", other),
    }
}

fn assert_single_active<A>(history: &[Record<A>]) {
    assert_eq!(
        history.iter().filter(|r| r.active).count(),
        1,
        "exactly one version should be active"
    );
}

/// Active tenant for tests that need a parent.
async fn parent_tenant(stores: &Stores, name: &str) -> String {
    stores
        .tenants
        .create(tenant(name))
        .await
        .expect("tenant create should succeed")
        .urn
}

// =============================================================================
// create
// =============================================================================

pub async fn test_create_assigns_first_version(stores: &Stores) {
    let record = stores
        .tenants
        .create(tenant("create_first"))
        .await
        .expect("create should succeed");

    assert_eq!(record.urn, "urn:orchestrix:tenant:create_first");
    assert_eq!(record.name, "create_first");
    assert_eq!(record.version, 1);
    assert!(record.active);
    assert!(record.deleted.is_none());
    assert_eq!(record.created, record.modified);
    assert_ne!(record.row_id, record.surrogate_id);
}

pub async fn test_create_computes_scoped_urn(stores: &Stores) {
    let tenant_urn = parent_tenant(stores, "acme").await;
    assert_eq!(tenant_urn, "urn:orchestrix:tenant:acme");

    let record = stores
        .hosts
        .create(host("web01", &tenant_urn, "10.0.0.1"))
        .await
        .expect("host create should succeed");

    assert_eq!(
        record.urn,
        "urn:orchestrix:host:host(urn:orchestrix:tenant:acme,web01)"
    );
}

pub async fn test_create_duplicate_is_already_exists(stores: &Stores) {
    stores
        .tenants
        .create(tenant("create_dup"))
        .await
        .expect("first create should succeed");

    let err = stores
        .tenants
        .create(tenant("create_dup"))
        .await
        .expect_err("second create should fail");
    assert!(
        matches!(&err, StoreError::AlreadyExists { urn } if urn == "urn:orchestrix:tenant:create_dup"),
        "got {:?}",
        err
    );

    let history = stores.tenants.get_history("create_dup").await.unwrap();
    assert_eq!(history.len(), 1, "failed create should not write");
}

pub async fn test_create_after_delete_keeps_urn_reserved(stores: &Stores) {
    stores.tenants.create(tenant("create_reuse")).await.unwrap();
    stores.tenants.delete("create_reuse").await.unwrap();

    let err = stores
        .tenants
        .create(tenant("create_reuse"))
        .await
        .expect_err("urn of a deleted record stays reserved");
    assert!(matches!(err, StoreError::AlreadyExists { .. }));
}

pub async fn test_create_rejects_invalid_name(stores: &Stores) {
    for name in ["Bad-Name", "", "has space"] {
        let err = stores
            .tenants
            .create(tenant(name))
            .await
            .expect_err("invalid name should fail");
        assert_validation(err, "name", kinds::VALUE_ERROR);
    }

    let err = stores
        .tenants
        .create(tenant(&"x".repeat(65)))
        .await
        .expect_err("overlong name should fail");
    assert_validation(err, "name", kinds::VALUE_ERROR);
}

pub async fn test_create_rejects_invalid_attributes(stores: &Stores) {
    let tenant_urn = parent_tenant(stores, "attr_parent").await;

    let err = stores
        .hosts
        .create(host("attr_host", &tenant_urn, "999.1.1.1"))
        .await
        .expect_err("bad ip should fail");
    assert_validation(err, "ip", kinds::VALUE_ERROR);

    let err = stores
        .users
        .create(user("attr_user", None, "not-an-email"))
        .await
        .expect_err("bad email should fail");
    assert_validation(err, "email", kinds::VALUE_ERROR);
}

pub async fn test_create_requires_active_reference(stores: &Stores) {
    let err = stores
        .hosts
        .create(host("ref_orphan", "urn:orchestrix:tenant:ref_missing", "10.0.0.2"))
        .await
        .expect_err("missing tenant should fail");
    assert_validation(err, "tenant_urn", kinds::REFERENCE_ERROR);

    let tenant_urn = parent_tenant(stores, "ref_retired").await;
    stores.tenants.delete(&tenant_urn).await.unwrap();

    let err = stores
        .hosts
        .create(host("ref_orphan", &tenant_urn, "10.0.0.2"))
        .await
        .expect_err("deleted tenant should fail");
    assert_validation(err, "tenant_urn", kinds::REFERENCE_ERROR);

    let written = stores
        .hosts
        .search(SearchQuery::default().filter("name", "ref_orphan"))
        .await
        .unwrap();
    assert!(written.is_empty(), "rejected creates should not write");
}

pub async fn test_create_unscoped_and_scoped_users(stores: &Stores) {
    let solo = stores
        .users
        .create(user("user_solo", None, "solo@example.com"))
        .await
        .unwrap();
    assert_eq!(solo.urn, "urn:orchestrix:user:user_solo");

    let tenant_urn = parent_tenant(stores, "user_parent").await;
    let scoped = stores
        .users
        .create(user("user_solo", Some(&tenant_urn), "scoped@example.com"))
        .await
        .expect("same name under a tenant is a different urn");
    assert_eq!(
        scoped.urn,
        "urn:orchestrix:user:user(urn:orchestrix:tenant:user_parent,user_solo)"
    );
}

// =============================================================================
// get / find
// =============================================================================

pub async fn test_identifier_resolution(stores: &Stores) {
    let created = stores.tenants.create(tenant("resolve_me")).await.unwrap();

    let by_urn = stores.tenants.get("urn:orchestrix:tenant:resolve_me").await.unwrap();
    let by_id = stores
        .tenants
        .get(&created.surrogate_id.to_string())
        .await
        .unwrap();
    let by_name = stores.tenants.get("resolve_me").await.unwrap();

    assert_eq!(by_urn, created);
    assert_eq!(by_id, created);
    assert_eq!(by_name, created);
}

pub async fn test_get_missing_is_not_found(stores: &Stores) {
    let err = stores
        .tenants
        .get("never_created")
        .await
        .expect_err("missing record");
    assert!(matches!(err, StoreError::NotFound { entity: "tenant", .. }));

    let found = stores.tenants.find("never_created").await.unwrap();
    assert!(found.is_none());
}

pub async fn test_ambiguous_name_requires_urn(stores: &Stores) {
    let first = parent_tenant(stores, "amb_one").await;
    let second = parent_tenant(stores, "amb_two").await;
    stores
        .hosts
        .create(host("amb_host", &first, "10.0.1.1"))
        .await
        .unwrap();
    let other = stores
        .hosts
        .create(host("amb_host", &second, "10.0.1.2"))
        .await
        .unwrap();

    let err = stores.hosts.get("amb_host").await.expect_err("ambiguous");
    assert_validation(err, "identifier", kinds::VALUE_ERROR);

    let resolved = stores.hosts.get(&other.urn).await.unwrap();
    assert_eq!(resolved.attributes.ip, "10.0.1.2");
}

pub async fn test_hex_name_resolves_as_name(stores: &Stores) {
    // 32 hex digits: a valid name and the simple form of a UUID
    let name = "0123456789abcdef0123456789abcdef";
    let created = stores.tenants.create(tenant(name)).await.unwrap();

    let by_name = stores.tenants.get(name).await.unwrap();
    assert_eq!(by_name, created);

    let history = stores.tenants.get_history(name).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].surrogate_id, created.surrogate_id);
}

// =============================================================================
// update
// =============================================================================

pub async fn test_update_versions_are_monotonic(stores: &Stores) {
    let tenant_urn = parent_tenant(stores, "mono_parent").await;
    let created = stores
        .hosts
        .create(host("mono_host", &tenant_urn, "10.0.2.1"))
        .await
        .unwrap();

    for (i, ip) in ["10.0.2.2", "10.0.2.3", "10.0.2.4"].iter().enumerate() {
        let updated = stores
            .hosts
            .update(&created.urn, patch::<Host>(json!({ "ip": ip })))
            .await
            .expect("update should succeed");

        assert_eq!(updated.version, i as i64 + 2);
        assert!(updated.active);
        assert_eq!(updated.attributes.ip, *ip);
        assert_eq!(updated.surrogate_id, created.surrogate_id);
        assert_eq!(updated.urn, created.urn);
        assert_eq!(updated.created, created.created);
        assert_ne!(updated.row_id, created.row_id);

        let history = stores.hosts.get_history(&created.urn).await.unwrap();
        assert_single_active(&history);
    }

    let history = stores.hosts.get_history(&created.urn).await.unwrap();
    let versions: Vec<i64> = history.iter().map(|r| r.version).collect();
    assert_eq!(versions, vec![1, 2, 3, 4]);
    assert!(history.iter().all(|r| r.surrogate_id == created.surrogate_id));
    assert!(history[..3].iter().all(|r| !r.active && r.deleted.is_some()));
    assert!(history[3].active && history[3].deleted.is_none());

    let current = stores.hosts.get("mono_host").await.unwrap();
    assert_eq!(current.version, 4);
    assert_eq!(current.attributes.ip, "10.0.2.4");
}

pub async fn test_update_ignores_immutable_fields(stores: &Stores) {
    let tenant_urn = parent_tenant(stores, "immut_parent").await;
    let other_tenant = parent_tenant(stores, "immut_other").await;
    let created = stores
        .hosts
        .create(host("immut_host", &tenant_urn, "10.0.3.1"))
        .await
        .unwrap();

    let updated = stores
        .hosts
        .update(
            "immut_host",
            patch::<Host>(json!({
                "name": "renamed",
                "tenant_urn": other_tenant,
                "urn": "urn:orchestrix:host:forged",
                "version": 99,
                "ip": "10.0.3.2",
            })),
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "immut_host");
    assert_eq!(updated.urn, created.urn);
    assert_eq!(updated.attributes.tenant_urn, tenant_urn);
    assert_eq!(updated.version, 2);
    assert_eq!(updated.attributes.ip, "10.0.3.2");
    assert!(stores.hosts.find("renamed").await.unwrap().is_none());
}

pub async fn test_update_validates_merged_attributes(stores: &Stores) {
    let tenant_urn = parent_tenant(stores, "upd_valid_parent").await;
    stores
        .hosts
        .create(host("upd_valid_host", &tenant_urn, "10.0.4.1"))
        .await
        .unwrap();

    let err = stores
        .hosts
        .update("upd_valid_host", patch::<Host>(json!({ "ip": "nope" })))
        .await
        .expect_err("invalid ip");
    assert_validation(err, "ip", kinds::VALUE_ERROR);

    let history = stores.hosts.get_history("upd_valid_host").await.unwrap();
    assert_eq!(history.len(), 1, "rejected update should not write");
    assert!(history[0].active);
}

pub async fn test_update_with_empty_patch(stores: &Stores) {
    let tenant_urn = parent_tenant(stores, "upd_empty_parent").await;
    let created = stores
        .hosts
        .create(host("upd_empty_host", &tenant_urn, "10.0.5.1"))
        .await
        .unwrap();

    let updated = stores
        .hosts
        .update("upd_empty_host", Patch::empty())
        .await
        .unwrap();
    assert_eq!(updated.version, 2);
    assert_eq!(updated.attributes, created.attributes);
}

pub async fn test_update_missing_is_not_found(stores: &Stores) {
    let err = stores
        .hosts
        .update("upd_nobody", patch::<Host>(json!({ "ip": "10.0.0.1" })))
        .await
        .expect_err("missing record");
    assert!(matches!(err, StoreError::NotFound { entity: "host", .. }));
}

// =============================================================================
// delete / history
// =============================================================================

pub async fn test_delete_then_history(stores: &Stores) {
    let tenant_urn = parent_tenant(stores, "del_parent").await;
    let created = stores
        .hosts
        .create(host("del_host", &tenant_urn, "10.0.6.1"))
        .await
        .unwrap();
    stores
        .hosts
        .update("del_host", patch::<Host>(json!({ "ip": "10.0.6.2" })))
        .await
        .unwrap();

    let retired = stores.hosts.delete(&created.urn).await.unwrap();
    assert_eq!(retired.version, 2);
    assert!(!retired.active);
    assert!(retired.deleted.is_some());

    let err = stores.hosts.get(&created.urn).await.expect_err("deleted");
    assert!(matches!(err, StoreError::NotFound { .. }));
    assert!(stores.hosts.find("del_host").await.unwrap().is_none());

    for identifier in [
        created.urn.clone(),
        created.surrogate_id.to_string(),
        "del_host".to_string(),
    ] {
        let history = stores.hosts.get_history(&identifier).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|r| !r.active && r.deleted.is_some()));
        assert_eq!(history[1], retired);
    }

    let err = stores.hosts.delete(&created.urn).await.expect_err("already deleted");
    assert!(matches!(err, StoreError::NotFound { .. }));
}

pub async fn test_history_of_missing_is_not_found(stores: &Stores) {
    let err = stores
        .tenants
        .get_history("urn:orchestrix:tenant:hist_nobody")
        .await
        .expect_err("missing record");
    assert!(matches!(err, StoreError::NotFound { .. }));
}

pub async fn test_round_trip(stores: &Stores) {
    let tenant_urn = parent_tenant(stores, "rt_parent").await;
    let input = user("rt_user", Some(&tenant_urn), "rt@example.com");

    let created = stores.users.create(input.clone()).await.unwrap();
    let fetched = stores.users.get(&created.urn).await.unwrap();

    let wire = serde_json::to_string(&fetched).unwrap();
    let decoded: Record<UserAttributes> = serde_json::from_str(&wire).unwrap();

    assert_eq!(decoded, fetched);
    assert_eq!(decoded.name, input.name);
    assert_eq!(decoded.attributes, input.attributes);
}

// =============================================================================
// list / search
// =============================================================================

pub async fn test_list_active_and_history(stores: &Stores) {
    stores.tenants.create(tenant("list_kept")).await.unwrap();
    stores.tenants.create(tenant("list_gone")).await.unwrap();
    stores.tenants.delete("list_gone").await.unwrap();

    let active: Vec<String> = stores
        .tenants
        .list_active()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert!(active.contains(&"list_kept".to_string()));
    assert!(!active.contains(&"list_gone".to_string()));

    let all = stores.tenants.list_history().await.unwrap();
    assert!(all.iter().any(|r| r.name == "list_gone" && !r.active));
    assert!(all.iter().any(|r| r.name == "list_kept" && r.active));
}

pub async fn test_search(stores: &Stores) {
    let tenant_urn = parent_tenant(stores, "search_parent").await;
    stores
        .hosts
        .create(host("search_a", &tenant_urn, "10.0.7.1"))
        .await
        .unwrap();
    stores
        .hosts
        .create(host("search_b", &tenant_urn, "10.0.7.2"))
        .await
        .unwrap();
    stores
        .hosts
        .update("search_b", patch::<Host>(json!({ "ip": "10.0.7.3" })))
        .await
        .unwrap();

    let by_tenant = SearchQuery::active().filter("tenant_urn", tenant_urn.as_str());
    assert_eq!(stores.hosts.search(by_tenant.clone()).await.unwrap().len(), 2);

    let stale_ip = stores
        .hosts
        .search(SearchQuery::active().filter("ip", "10.0.7.2"))
        .await
        .unwrap();
    assert!(stale_ip.is_empty(), "retired value is not active");

    let stale_history = stores
        .hosts
        .search(SearchQuery::default().filter("ip", "10.0.7.2"))
        .await
        .unwrap();
    assert_eq!(stale_history.len(), 1);
    assert!(!stale_history[0].active);

    let first_versions = stores
        .hosts
        .search(
            SearchQuery::default()
                .filter("tenant_urn", tenant_urn.as_str())
                .filter("version", "1"),
        )
        .await
        .unwrap();
    assert_eq!(first_versions.len(), 2);

    let retired = stores
        .hosts
        .search(
            SearchQuery::default()
                .filter("tenant_urn", tenant_urn.as_str())
                .filter("active", "false"),
        )
        .await
        .unwrap();
    assert_eq!(retired.len(), 1);
    assert_eq!(retired[0].name, "search_b");

    let window = stores.hosts.search(by_tenant.clone().window(1, Some(1))).await.unwrap();
    assert_eq!(window.len(), 1);
    let skipped = stores.hosts.search(by_tenant.window(1, None)).await.unwrap();
    assert_eq!(skipped.len(), 1);
}

pub async fn test_search_with_oversized_window(stores: &Stores) {
    let tenant_urn = parent_tenant(stores, "window_parent").await;
    stores
        .hosts
        .create(host("window_host", &tenant_urn, "10.0.8.1"))
        .await
        .unwrap();
    let by_tenant = SearchQuery::active().filter("tenant_urn", tenant_urn.as_str());

    let all = stores
        .hosts
        .search(by_tenant.clone().window(0, Some(u64::MAX)))
        .await
        .unwrap();
    assert_eq!(all.len(), 1);

    let past_end = stores
        .hosts
        .search(by_tenant.window(u64::MAX, None))
        .await
        .unwrap();
    assert!(past_end.is_empty());
}

pub async fn test_search_rejects_bad_filters(stores: &Stores) {
    let err = stores
        .hosts
        .search(SearchQuery::active().filter("colour", "red"))
        .await
        .expect_err("unknown field");
    assert_validation(err, "colour", kinds::VALUE_ERROR);

    let err = stores
        .hosts
        .search(SearchQuery::active().filter("active", "false"))
        .await
        .expect_err("conflicting filter mode");
    assert_validation(err, "active", kinds::VALUE_ERROR);

    let err = stores
        .hosts
        .search(SearchQuery::default().filter("version", "two"))
        .await
        .expect_err("non-integer version");
    assert_validation(err, "version", kinds::VALUE_ERROR);
}

pub async fn test_validate_data(stores: &Stores) {
    let tenant_urn = parent_tenant(stores, "vd_parent").await;

    let ok = host("vd_host", &tenant_urn, "192.168.0.1");
    stores
        .hosts
        .validate_data(&ok.name, &ok.attributes)
        .await
        .expect("valid data");

    let orphan = host("vd_host", "urn:orchestrix:tenant:vd_missing", "192.168.0.1");
    let err = stores
        .hosts
        .validate_data(&orphan.name, &orphan.attributes)
        .await
        .expect_err("missing reference");
    assert_validation(err, "tenant_urn", kinds::REFERENCE_ERROR);

    assert!(
        stores.hosts.find("vd_host").await.unwrap().is_none(),
        "validation never writes"
    );
}

/// Run all VersionedStore tests against `Stores`.
#[macro_export]
macro_rules! run_versioned_store_tests {
    ($stores:expr) => {
        use $crate::store::versioned_store_tests::*;

        // create tests
        test_create_assigns_first_version($stores).await;
        println!("  test_create_assigns_first_version: PASSED");

        test_create_computes_scoped_urn($stores).await;
        println!("  test_create_computes_scoped_urn: PASSED");

        test_create_duplicate_is_already_exists($stores).await;
        println!("  test_create_duplicate_is_already_exists: PASSED");

        test_create_after_delete_keeps_urn_reserved($stores).await;
        println!("  test_create_after_delete_keeps_urn_reserved: PASSED");

        test_create_rejects_invalid_name($stores).await;
        println!("  test_create_rejects_invalid_name: PASSED");

        test_create_rejects_invalid_attributes($stores).await;
        println!("  test_create_rejects_invalid_attributes: PASSED");

        test_create_requires_active_reference($stores).await;
        println!("  test_create_requires_active_reference: PASSED");

        test_create_unscoped_and_scoped_users($stores).await;
        println!("  test_create_unscoped_and_scoped_users: PASSED");

        // get tests
        test_identifier_resolution($stores).await;
        println!("  test_identifier_resolution: PASSED");

        test_get_missing_is_not_found($stores).await;
        println!("  test_get_missing_is_not_found: PASSED");

        test_ambiguous_name_requires_urn($stores).await;
        println!("  test_ambiguous_name_requires_urn: PASSED");

        test_hex_name_resolves_as_name($stores).await;
        println!("  test_hex_name_resolves_as_name: PASSED");

        // update tests
        test_update_versions_are_monotonic($stores).await;
        println!("  test_update_versions_are_monotonic: PASSED");

        test_update_ignores_immutable_fields($stores).await;
        println!("  test_update_ignores_immutable_fields: PASSED");

        test_update_validates_merged_attributes($stores).await;
        println!("  test_update_validates_merged_attributes: PASSED");

        test_update_with_empty_patch($stores).await;
        println!("  test_update_with_empty_patch: PASSED");

        test_update_missing_is_not_found($stores).await;
        println!("  test_update_missing_is_not_found: PASSED");

        // delete / history tests
        test_delete_then_history($stores).await;
        println!("  test_delete_then_history: PASSED");

        test_history_of_missing_is_not_found($stores).await;
        println!("  test_history_of_missing_is_not_found: PASSED");

        test_round_trip($stores).await;
        println!("  test_round_trip: PASSED");

        // list / search tests
        test_list_active_and_history($stores).await;
        println!("  test_list_active_and_history: PASSED");

        test_search($stores).await;
        println!("  test_search: PASSED");

        test_search_with_oversized_window($stores).await;
        println!("  test_search_with_oversized_window: PASSED");

        test_search_rejects_bad_filters($stores).await;
        println!("  test_search_rejects_bad_filters: PASSED");

        test_validate_data($stores).await;
        println!("  test_validate_data: PASSED");
    };
}
