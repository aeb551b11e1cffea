mod common;

use api::employees::{self, EmployeeUpdate};
use api::{audit, departments, users, ApiError};
use common::{bootstrap_sqlite, employee_input, seed_department, seed_user};
use entity::app_user::Role;
use entity::{audit_trail, employee};
use uuid::Uuid;

#[tokio::test]
async fn record_trail_is_chronological_over_the_full_lifecycle() {
    let db = bootstrap_sqlite().await;
    let dept = seed_department(&db, "Engineering").await;
    let admin = seed_user(&db, "admin", Role::Admin, None).await;

    let created = employees::create(&db, employee_input("ada@example.com", dept.id), &admin)
        .await
        .unwrap();
    let patch = EmployeeUpdate {
        first_name: created.first_name.clone(),
        last_name: created.last_name.clone(),
        email: created.email.clone(),
        job_title: "Principal Engineer".into(),
        department_id: created.department_id,
        manager_id: None,
        salary_cents: created.salary_cents,
        status: employee::Status::Active,
    };
    employees::update(&db, created.id, patch, &admin)
        .await
        .unwrap();
    employees::delete(&db, created.id, &admin).await.unwrap();

    let trail = audit::trail_for_record(&db, "employees", created.id)
        .await
        .unwrap();
    let actions: Vec<_> = trail.iter().map(|entry| entry.action).collect();
    assert_eq!(
        actions,
        vec![
            audit_trail::Action::Create,
            audit_trail::Action::Update,
            audit_trail::Action::Delete,
        ]
    );
    assert!(trail.windows(2).all(|w| w[0].changed_at <= w[1].changed_at));
}

#[tokio::test]
async fn trails_are_keyed_by_logical_table_name() {
    let db = bootstrap_sqlite().await;
    let admin = seed_user(&db, "admin", Role::Admin, None).await;

    let dept = departments::create(
        &db,
        departments::DepartmentInput {
            name: "Engineering".into(),
        },
        &admin,
    )
    .await
    .unwrap();
    let emp = employees::create(&db, employee_input("ada@example.com", dept.id), &admin)
        .await
        .unwrap();
    let user = users::create(
        &db,
        users::NewUser {
            username: "hanna".into(),
            email: "hanna@example.com".into(),
            password: "s3cret-pw".into(),
            role: Role::Hr,
            department_id: None,
        },
    )
    .await
    .unwrap();

    for (table, id) in [
        ("departments", dept.id),
        ("employees", emp.id),
        ("users", user.id),
    ] {
        let trail = audit::trail_for_record(&db, table, id).await.unwrap();
        assert_eq!(trail.len(), 1, "expected one entry under {table}");
        assert_eq!(trail[0].table_name, table);
    }

    // A lookup under the wrong key finds nothing.
    let empty = audit::trail_for_record(&db, "employee", emp.id).await.unwrap();
    assert!(empty.is_empty());
}

#[tokio::test]
async fn actions_by_user_separates_actors() {
    let db = bootstrap_sqlite().await;
    let dept = seed_department(&db, "Engineering").await;
    let admin = seed_user(&db, "admin", Role::Admin, None).await;
    let hr = seed_user(&db, "hr", Role::Hr, None).await;

    employees::create(&db, employee_input("ada@example.com", dept.id), &admin)
        .await
        .unwrap();
    employees::create(&db, employee_input("bob@example.com", dept.id), &hr)
        .await
        .unwrap();
    employees::create(&db, employee_input("eve@example.com", dept.id), &hr)
        .await
        .unwrap();

    assert_eq!(audit::actions_by_user(&db, admin.id).await.unwrap().len(), 1);
    assert_eq!(audit::actions_by_user(&db, hr.id).await.unwrap().len(), 2);
    assert!(audit::actions_by_user(&db, Uuid::new_v4())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn list_all_returns_newest_first() {
    let db = bootstrap_sqlite().await;
    let dept = seed_department(&db, "Engineering").await;
    let admin = seed_user(&db, "admin", Role::Admin, None).await;

    employees::create(&db, employee_input("ada@example.com", dept.id), &admin)
        .await
        .unwrap();
    employees::create(&db, employee_input("bob@example.com", dept.id), &admin)
        .await
        .unwrap();

    let all = audit::list_all(&db).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all[0].changed_at >= all[1].changed_at);
}

#[tokio::test]
async fn rolled_back_mutation_leaves_no_audit_entry() {
    let db = bootstrap_sqlite().await;
    let dept = seed_department(&db, "Engineering").await;
    let admin = seed_user(&db, "admin", Role::Admin, None).await;

    let mut input = employee_input("ada@example.com", dept.id);
    input.manager_id = Some(Uuid::new_v4());
    let err = employees::create(&db, input, &admin).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    assert!(audit::list_all(&db).await.unwrap().is_empty());
}
