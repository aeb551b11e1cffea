use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Department { Table, Id, Name, CreatedAt }

#[derive(DeriveIden)]
enum AppUser { Table, Id, Username, PasswordHash, Role, Email, DepartmentId, CreatedAt, LastLogin }

#[derive(DeriveIden)]
enum Employee {
    Table, Id, FirstName, LastName, Email, HireDate, JobTitle,
    DepartmentId, ManagerId, SalaryCents, Status, CreatedAt, UpdatedAt, CreatedBy, UpdatedBy,
}

#[derive(DeriveIden)]
enum AuditTrail { Table, Id, TableName, RecordId, Action, OldValues, NewValues, ChangedBy, ChangedAt }

#[derive(DeriveMigrationName)]
pub struct Migration;
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Extensions (safe if already present)
        manager.get_connection().execute_unprepared(r#"CREATE EXTENSION IF NOT EXISTS "pgcrypto";"#).await?;

        manager.create_table(
            Table::create()
                .table(Department::Table)
                .if_not_exists()
                .col(ColumnDef::new(Department::Id).uuid().not_null().primary_key().default(Expr::cust("gen_random_uuid()")))
                .col(ColumnDef::new(Department::Name).string_len(128).not_null())
                .col(ColumnDef::new(Department::CreatedAt).timestamp_with_time_zone().not_null().default(Expr::cust("now()")))
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create().name("idx_department_name").table(Department::Table).col(Department::Name).unique().to_owned()
        ).await?;

        manager.create_table(
            Table::create()
                .table(AppUser::Table)
                .if_not_exists()
                .col(ColumnDef::new(AppUser::Id).uuid().not_null().primary_key().default(Expr::cust("gen_random_uuid()")))
                .col(ColumnDef::new(AppUser::Username).string_len(64).not_null())
                .col(ColumnDef::new(AppUser::PasswordHash).string_len(256).not_null())
                .col(ColumnDef::new(AppUser::Role).string_len(16).not_null())
                .col(ColumnDef::new(AppUser::Email).string_len(320).not_null())
                .col(ColumnDef::new(AppUser::DepartmentId).uuid())
                .col(ColumnDef::new(AppUser::CreatedAt).timestamp_with_time_zone().not_null().default(Expr::cust("now()")))
                .col(ColumnDef::new(AppUser::LastLogin).timestamp_with_time_zone())
                .foreign_key(ForeignKey::create()
                    .name("fk_app_user_department")
                    .from(AppUser::Table, AppUser::DepartmentId)
                    .to(Department::Table, Department::Id)
                    .on_delete(ForeignKeyAction::SetNull)
                    .on_update(ForeignKeyAction::Cascade)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create().name("idx_app_user_username").table(AppUser::Table).col(AppUser::Username).unique().to_owned()
        ).await?;

        manager.create_index(
            Index::create().name("idx_app_user_email").table(AppUser::Table).col(AppUser::Email).unique().to_owned()
        ).await?;

        manager.create_table(
            Table::create()
                .table(Employee::Table)
                .if_not_exists()
                .col(ColumnDef::new(Employee::Id).uuid().not_null().primary_key().default(Expr::cust("gen_random_uuid()")))
                .col(ColumnDef::new(Employee::FirstName).string_len(128).not_null())
                .col(ColumnDef::new(Employee::LastName).string_len(128).not_null())
                .col(ColumnDef::new(Employee::Email).string_len(320).not_null())
                .col(ColumnDef::new(Employee::HireDate).date().not_null())
                .col(ColumnDef::new(Employee::JobTitle).string_len(128).not_null())
                .col(ColumnDef::new(Employee::DepartmentId).uuid())
                .col(ColumnDef::new(Employee::ManagerId).uuid())
                .col(ColumnDef::new(Employee::SalaryCents).big_integer())
                .col(ColumnDef::new(Employee::Status).string_len(16).not_null().default("ACTIVE"))
                .col(ColumnDef::new(Employee::CreatedAt).timestamp_with_time_zone().not_null().default(Expr::cust("now()")))
                .col(ColumnDef::new(Employee::UpdatedAt).timestamp_with_time_zone().not_null().default(Expr::cust("now()")))
                .col(ColumnDef::new(Employee::CreatedBy).uuid())
                .col(ColumnDef::new(Employee::UpdatedBy).uuid())
                .foreign_key(ForeignKey::create()
                    .name("fk_employee_department")
                    .from(Employee::Table, Employee::DepartmentId)
                    .to(Department::Table, Department::Id)
                    .on_delete(ForeignKeyAction::Restrict)
                    .on_update(ForeignKeyAction::Cascade)
                )
                .foreign_key(ForeignKey::create()
                    .name("fk_employee_manager")
                    .from(Employee::Table, Employee::ManagerId)
                    .to(Employee::Table, Employee::Id)
                    .on_delete(ForeignKeyAction::SetNull)
                )
                .foreign_key(ForeignKey::create()
                    .name("fk_employee_created_by")
                    .from(Employee::Table, Employee::CreatedBy)
                    .to(AppUser::Table, AppUser::Id)
                    .on_delete(ForeignKeyAction::SetNull)
                )
                .foreign_key(ForeignKey::create()
                    .name("fk_employee_updated_by")
                    .from(Employee::Table, Employee::UpdatedBy)
                    .to(AppUser::Table, AppUser::Id)
                    .on_delete(ForeignKeyAction::SetNull)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create().name("idx_employee_email").table(Employee::Table).col(Employee::Email).unique().to_owned()
        ).await?;

        manager.create_index(
            Index::create().name("idx_employee_department").table(Employee::Table).col(Employee::DepartmentId).to_owned()
        ).await?;

        manager.create_index(
            Index::create().name("idx_employee_status").table(Employee::Table).col(Employee::Status).to_owned()
        ).await?;

        manager.create_table(
            Table::create()
                .table(AuditTrail::Table)
                .if_not_exists()
                .col(ColumnDef::new(AuditTrail::Id).uuid().not_null().primary_key().default(Expr::cust("gen_random_uuid()")))
                .col(ColumnDef::new(AuditTrail::TableName).string_len(64).not_null())
                .col(ColumnDef::new(AuditTrail::RecordId).uuid().not_null())
                .col(ColumnDef::new(AuditTrail::Action).string_len(16).not_null())
                .col(ColumnDef::new(AuditTrail::OldValues).json_binary())
                .col(ColumnDef::new(AuditTrail::NewValues).json_binary())
                .col(ColumnDef::new(AuditTrail::ChangedBy).uuid())
                .col(ColumnDef::new(AuditTrail::ChangedAt).timestamp_with_time_zone().not_null().default(Expr::cust("now()")))
                .foreign_key(ForeignKey::create()
                    .name("fk_audit_trail_changed_by")
                    .from(AuditTrail::Table, AuditTrail::ChangedBy)
                    .to(AppUser::Table, AppUser::Id)
                    .on_delete(ForeignKeyAction::SetNull)
                )
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create().name("idx_audit_trail_record").table(AuditTrail::Table).col(AuditTrail::TableName).col(AuditTrail::RecordId).to_owned()
        ).await?;

        manager.create_index(
            Index::create().name("idx_audit_trail_changed_by").table(AuditTrail::Table).col(AuditTrail::ChangedBy).to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(AuditTrail::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Employee::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(AppUser::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Department::Table).to_owned()).await?;
        Ok(())
    }
}
