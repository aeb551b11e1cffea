mod common;

use api::departments::{self, DepartmentInput};
use api::{audit, employees, ApiError};
use common::{bootstrap_sqlite, employee_input, seed_department, seed_user};
use entity::app_user::Role;
use entity::{audit_trail, department};
use sea_orm::EntityTrait;

#[tokio::test]
async fn create_is_admin_only() {
    let db = bootstrap_sqlite().await;
    let hr = seed_user(&db, "hr", Role::Hr, None).await;

    let err = departments::create(
        &db,
        DepartmentInput {
            name: "Engineering".into(),
        },
        &hr,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::AccessDenied(_)));
}

#[tokio::test]
async fn create_audits_and_rejects_duplicate_names() {
    let db = bootstrap_sqlite().await;
    let admin = seed_user(&db, "admin", Role::Admin, None).await;

    let saved = departments::create(
        &db,
        DepartmentInput {
            name: "Engineering".into(),
        },
        &admin,
    )
    .await
    .unwrap();

    let trail = audit::trail_for_record(&db, "departments", saved.id)
        .await
        .unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action, audit_trail::Action::Create);
    assert_eq!(trail[0].changed_by, Some(admin.id));

    let err = departments::create(
        &db,
        DepartmentInput {
            name: "Engineering".into(),
        },
        &admin,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Duplicate(_)));
}

#[tokio::test]
async fn rename_keeps_same_name_allowed_and_audits_change() {
    let db = bootstrap_sqlite().await;
    let admin = seed_user(&db, "admin", Role::Admin, None).await;
    let dept = seed_department(&db, "Engineering").await;

    // Saving under the unchanged name is not a duplicate.
    departments::update(
        &db,
        dept.id,
        DepartmentInput {
            name: "Engineering".into(),
        },
        &admin,
    )
    .await
    .unwrap();

    let renamed = departments::update(
        &db,
        dept.id,
        DepartmentInput {
            name: "Platform".into(),
        },
        &admin,
    )
    .await
    .unwrap();
    assert_eq!(renamed.name, "Platform");

    let trail = audit::trail_for_record(&db, "departments", dept.id)
        .await
        .unwrap();
    let last = trail.last().unwrap();
    assert_eq!(last.action, audit_trail::Action::Update);
    assert_eq!(last.old_values.as_ref().unwrap()["name"], "Engineering");
    assert_eq!(last.new_values.as_ref().unwrap()["name"], "Platform");
}

#[tokio::test]
async fn no_op_update_still_writes_an_audit_entry() {
    let db = bootstrap_sqlite().await;
    let admin = seed_user(&db, "admin", Role::Admin, None).await;
    let dept = seed_department(&db, "Engineering").await;

    // Resubmitting the stored name is persisted and audited like any other
    // update; both snapshots carry the same name.
    departments::update(
        &db,
        dept.id,
        DepartmentInput {
            name: "Engineering".into(),
        },
        &admin,
    )
    .await
    .unwrap();

    let trail = audit::trail_for_record(&db, "departments", dept.id)
        .await
        .unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action, audit_trail::Action::Update);
    assert_eq!(trail[0].old_values.as_ref().unwrap()["name"], "Engineering");
    assert_eq!(trail[0].new_values.as_ref().unwrap()["name"], "Engineering");
}

#[tokio::test]
async fn delete_refused_while_employees_remain() {
    let db = bootstrap_sqlite().await;
    let admin = seed_user(&db, "admin", Role::Admin, None).await;
    let dept = seed_department(&db, "Engineering").await;
    employees::create(&db, employee_input("ada@example.com", dept.id), &admin)
        .await
        .unwrap();

    let err = departments::delete(&db, dept.id, &admin).await.unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));

    let still_there = department::Entity::find_by_id(dept.id)
        .one(&db)
        .await
        .unwrap();
    assert!(still_there.is_some());
}

#[tokio::test]
async fn delete_removes_empty_department_and_audits() {
    let db = bootstrap_sqlite().await;
    let admin = seed_user(&db, "admin", Role::Admin, None).await;
    let dept = seed_department(&db, "Facilities").await;

    departments::delete(&db, dept.id, &admin).await.unwrap();

    let gone = department::Entity::find_by_id(dept.id)
        .one(&db)
        .await
        .unwrap();
    assert!(gone.is_none());

    let trail = audit::trail_for_record(&db, "departments", dept.id)
        .await
        .unwrap();
    assert_eq!(trail.len(), 1);
    assert_eq!(trail[0].action, audit_trail::Action::Delete);
    assert!(trail[0].old_values.is_some());
    assert!(trail[0].new_values.is_none());
}

#[tokio::test]
async fn listing_is_scoped_by_role() {
    let db = bootstrap_sqlite().await;
    let eng = seed_department(&db, "Engineering").await;
    seed_department(&db, "Sales").await;

    let admin = seed_user(&db, "admin", Role::Admin, None).await;
    let hr = seed_user(&db, "hr", Role::Hr, None).await;
    let manager = seed_user(&db, "mgr", Role::Manager, Some(eng.id)).await;
    let unassigned = seed_user(&db, "lone", Role::Manager, None).await;
    let plain = seed_user(&db, "emp", Role::Employee, None).await;

    assert_eq!(departments::list_all(&db, &admin).await.unwrap().len(), 2);
    assert_eq!(departments::list_all(&db, &hr).await.unwrap().len(), 2);

    let own = departments::list_all(&db, &manager).await.unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].id, eng.id);

    assert!(departments::list_all(&db, &unassigned).await.unwrap().is_empty());
    assert!(departments::list_all(&db, &plain).await.unwrap().is_empty());
}

#[tokio::test]
async fn get_respects_department_scope() {
    let db = bootstrap_sqlite().await;
    let eng = seed_department(&db, "Engineering").await;
    let sales = seed_department(&db, "Sales").await;
    let manager = seed_user(&db, "mgr", Role::Manager, Some(eng.id)).await;

    departments::get(&db, eng.id, &manager).await.unwrap();
    let err = departments::get(&db, sales.id, &manager).await.unwrap_err();
    assert!(matches!(err, ApiError::AccessDenied(_)));
}
