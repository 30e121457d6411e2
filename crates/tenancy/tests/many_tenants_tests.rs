//! Many-tenant scoping tests.
//!
//! Posts are linked to tenants through the `tenantables` association table.

mod common;

use serde_json::json;

use common::*;
use helios_tenancy::backends::sqlite::{SqliteBackend, TenantTableBuilder};
use helios_tenancy::config::MorphRelationOverrides;
use helios_tenancy::error::{LookupError, TenancyError};
use helios_tenancy::model::{EntityDeclaration, Record};
use helios_tenancy::tenant::TenantValue;
use helios_tenancy::{AssociationStorage, TenantContext};

fn tenants(ids: &[i64]) -> TenantContext {
    let mut ctx = TenantContext::new();
    for id in ids {
        ctx.push_tenant("tenant_id", *id).unwrap();
    }
    ctx
}

#[tokio::test]
async fn test_create_attaches_every_active_tenant() {
    let engine = create_engine();
    let backend = create_backend(&engine);
    let posts = posts(&engine);

    let ctx = tenants(&[1, 2]);
    let repo = engine.repository(&backend, posts.clone(), &ctx);
    let created = repo.create(post("Hello")).await.unwrap();

    let relation = posts.relation().morph_relation().unwrap();
    let linked = backend
        .associated_tenants(relation, posts.morph_type(), created.get("id").unwrap())
        .await
        .unwrap();
    assert_eq!(
        linked.into_iter().collect::<Vec<_>>(),
        vec![TenantValue::Integer(1), TenantValue::Integer(2)]
    );
}

#[tokio::test]
async fn test_saving_again_does_not_duplicate_associations() {
    let engine = create_engine();
    let backend = create_backend(&engine);

    let ctx = tenants(&[1, 2]);
    let repo = engine.repository(&backend, posts(&engine), &ctx);
    let created = repo.create(post("Hello")).await.unwrap();
    repo.update(created.clone().with("title", "Hello again"))
        .await
        .unwrap();
    repo.update(created.clone()).await.unwrap();

    let linked = repo.tenants_of(&created).await.unwrap();
    assert_eq!(tenant_ids(&linked).len(), 2);
}

#[tokio::test]
async fn test_reads_are_filtered_by_membership() {
    let engine = create_engine();
    let backend = create_backend(&engine);

    for (ids, title) in [(&[1][..], "one"), (&[2][..], "two"), (&[1, 2][..], "both")] {
        let ctx = tenants(ids);
        engine
            .repository(&backend, posts(&engine), &ctx)
            .create(post(title))
            .await
            .unwrap();
    }

    let ctx = tenants(&[1]);
    let repo = engine.repository(&backend, posts(&engine), &ctx);
    assert_eq!(titles(&repo.all().await.unwrap()), vec!["both", "one"]);

    let ctx = tenants(&[2]);
    let repo = engine.repository(&backend, posts(&engine), &ctx);
    assert_eq!(titles(&repo.all().await.unwrap()), vec!["both", "two"]);

    let ctx = tenants(&[3]);
    let repo = engine.repository(&backend, posts(&engine), &ctx);
    assert!(repo.all().await.unwrap().is_empty());
    assert_eq!(repo.get(&repo.all_tenants()).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_update_resyncs_to_current_tenants() {
    let engine = create_engine();
    let backend = create_backend(&engine);

    let ctx = tenants(&[1, 2]);
    let created = engine
        .repository(&backend, posts(&engine), &ctx)
        .create(post("Moving"))
        .await
        .unwrap();

    let ctx = tenants(&[2, 3]);
    let repo = engine.repository(&backend, posts(&engine), &ctx);
    repo.update(created.clone()).await.unwrap();

    let linked = tenant_ids(&repo.tenants_of(&created).await.unwrap());
    assert_eq!(linked, vec![TenantValue::Integer(2), TenantValue::Integer(3)]);

    let ctx = tenants(&[1]);
    let repo = engine.repository(&backend, posts(&engine), &ctx);
    assert!(repo.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_detached_tenant_is_restored() {
    let engine = create_engine();
    let backend = create_backend(&engine);

    let ctx = tenants(&[1, 2]);
    let created = engine
        .repository(&backend, posts(&engine), &ctx)
        .create(post("Round trip"))
        .await
        .unwrap();

    let ctx = tenants(&[1]);
    engine
        .repository(&backend, posts(&engine), &ctx)
        .update(created.clone())
        .await
        .unwrap();

    let ctx = tenants(&[1, 2]);
    let repo = engine.repository(&backend, posts(&engine), &ctx);
    repo.update(created.clone()).await.unwrap();
    assert_eq!(tenant_ids(&repo.tenants_of(&created).await.unwrap()).len(), 2);

    let ctx = tenants(&[2]);
    let repo = engine.repository(&backend, posts(&engine), &ctx);
    assert_eq!(titles(&repo.all().await.unwrap()), vec!["Round trip"]);
}

#[tokio::test]
async fn test_find_or_fail_for_unlinked_post() {
    let engine = create_engine();
    let backend = create_backend(&engine);

    let ctx = tenants(&[1]);
    let created = engine
        .repository(&backend, posts(&engine), &ctx)
        .create(post("Private"))
        .await
        .unwrap();
    let id = created.get("id").cloned().unwrap();

    let ctx = tenants(&[2]);
    let repo = engine.repository(&backend, posts(&engine), &ctx);
    let err = repo.find_or_fail(id.clone()).await.unwrap_err();
    match err {
        TenancyError::Lookup(LookupError::ModelNotFoundForTenant { model, tenants, .. }) => {
            assert_eq!(model, "posts");
            assert_eq!(tenants, "{tenant_id: [2]}");
        }
        other => panic!("expected ModelNotFoundForTenant, got {:?}", other),
    }

    let ctx = tenants(&[1]);
    let repo = engine.repository(&backend, posts(&engine), &ctx);
    assert_eq!(
        repo.find_or_fail(id).await.unwrap().get("title"),
        Some(&json!("Private"))
    );
}

#[tokio::test]
async fn test_opted_out_record_gets_no_associations() {
    let engine = create_engine();
    let backend = create_backend(&engine);

    let ctx = tenants(&[1]);
    let repo = engine.repository(&backend, posts(&engine), &ctx);
    let created = repo
        .create(post("Global").without_tenant_scope())
        .await
        .unwrap();

    assert!(repo.tenants_of(&created).await.unwrap().is_empty());
    assert!(repo.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unscoped_context_touches_no_associations() {
    let engine = create_engine();
    let backend = create_backend(&engine);

    let ctx = tenants(&[1]);
    let repo = engine.repository(&backend, posts(&engine), &ctx);
    let created = repo.create(post("Kept")).await.unwrap();

    let mut ctx = tenants(&[1]);
    ctx.disable();
    let repo = engine.repository(&backend, posts(&engine), &ctx);
    repo.update(created.clone().with("title", "Still kept"))
        .await
        .unwrap();

    let ctx = TenantContext::new();
    let repo = engine.repository(&backend, posts(&engine), &ctx);
    repo.update(created.clone()).await.unwrap();

    let ctx = tenants(&[1]);
    let repo = engine.repository(&backend, posts(&engine), &ctx);
    assert_eq!(titles(&repo.all().await.unwrap()), vec!["Kept"]);
}

#[tokio::test]
async fn test_uuid_tenants() {
    let engine = create_engine();
    let backend = create_backend(&engine);

    let team = uuid::Uuid::new_v4().to_string();
    let other = uuid::Uuid::new_v4().to_string();

    let ctx = create_tenant("tenant_id", team.clone());
    let repo = engine.repository(&backend, posts(&engine), &ctx);
    let created = repo.create(post("Team post")).await.unwrap();

    let linked = repo.tenants_of(&created).await.unwrap();
    assert_eq!(linked.keys().map(|key| key.as_str()).collect::<Vec<_>>(), vec!["tenant_id"]);
    assert!(tenant_ids(&linked).contains(&TenantValue::Text(team)));

    let ctx = create_tenant("tenant_id", other);
    let repo = engine.repository(&backend, posts(&engine), &ctx);
    assert!(repo.all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_custom_association_table_without_soft_delete() {
    let engine = create_engine();
    let backend = create_backend(&engine);

    let overrides = MorphRelationOverrides {
        table: Some("article_tenants".to_string()),
        soft_delete_column: Some(String::new()),
        ..Default::default()
    };
    let articles = engine
        .resolve(
            &EntityDeclaration::new("articles")
                .tenant_columns(["tenant_id"])
                .belongs_to_many()
                .morph_relation(overrides),
        )
        .unwrap();
    let relation = articles.relation().morph_relation().unwrap().clone();
    assert!(relation.soft_delete_column.is_none());

    backend.init_association_table(&relation).unwrap();
    backend
        .execute_batch(
            "CREATE TABLE articles (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT NOT NULL);",
        )
        .unwrap();

    let ctx = tenants(&[1, 2]);
    let created = engine
        .repository(&backend, articles.clone(), &ctx)
        .create(Record::new().with("title", "Shared"))
        .await
        .unwrap();

    let ctx = tenants(&[2]);
    let repo = engine.repository(&backend, articles.clone(), &ctx);
    repo.update(created.clone()).await.unwrap();

    let linked = tenant_ids(&repo.tenants_of(&created).await.unwrap());
    assert_eq!(linked, vec![TenantValue::Integer(2)]);
    assert_eq!(titles(&repo.all().await.unwrap()), vec!["Shared"]);
}

#[tokio::test]
async fn test_create_removes_row_when_association_fails() {
    let engine = create_engine();
    let posts = posts(&engine);

    // Entity table only, no association table
    let backend = SqliteBackend::in_memory().unwrap();
    backend
        .execute_batch(
            &TenantTableBuilder::for_entity(&posts)
                .column("title", "TEXT", false)
                .to_sqlite_ddl(),
        )
        .unwrap();

    let ctx = tenants(&[1]);
    let repo = engine.repository(&backend, posts, &ctx);
    assert!(repo.create(post("Orphan")).await.is_err());
    assert!(repo.get(&repo.all_tenants()).await.unwrap().is_empty());
}
