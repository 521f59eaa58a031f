//! Compiles visibility predicates into parameterized SQL.
//!
//! The generated fragment runs against `tasks t LEFT JOIN tasks p ON
//! p.id = t.parent_id`. Every leaf is wrapped so it evaluates to `TRUE` or
//! `FALSE`, never `NULL`, keeping `NOT` faithful to the in-memory semantics.

use crate::visibility::TaskPredicate;
use diesel::pg::Pg;
use diesel::query_builder::BoxedSqlQuery;
use diesel::sql_types;
use serde_json::{Value, json};

const TASK_ALIAS: &str = "t";
const PARENT_ALIAS: &str = "p";

/// Bound parameter of a compiled predicate.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum BindValue {
    Uuid(uuid::Uuid),
    UuidArray(Vec<uuid::Uuid>),
    Jsonb(Value),
}

/// A compiled `WHERE` fragment with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct SqlFilter {
    pub(super) sql: String,
    pub(super) binds: Vec<BindValue>,
}

impl SqlFilter {
    pub(super) fn compile(predicate: &TaskPredicate) -> Self {
        let mut filter = Self {
            sql: String::new(),
            binds: Vec::new(),
        };
        let sql = filter.fragment(predicate, TASK_ALIAS);
        filter.sql = sql;
        filter
    }

    /// The full task listing query, oldest first.
    pub(super) fn listing_sql(&self) -> String {
        format!(
            "SELECT {TASK_ALIAS}.* FROM tasks {TASK_ALIAS} \
             LEFT JOIN tasks {PARENT_ALIAS} ON {PARENT_ALIAS}.id = {TASK_ALIAS}.parent_id \
             WHERE {} ORDER BY {TASK_ALIAS}.created_at, {TASK_ALIAS}.id",
            self.sql
        )
    }

    pub(super) fn bind_all<'f>(
        self,
        mut query: BoxedSqlQuery<'f, Pg, diesel::query_builder::SqlQuery>,
    ) -> BoxedSqlQuery<'f, Pg, diesel::query_builder::SqlQuery> {
        for value in self.binds {
            query = match value {
                BindValue::Uuid(uuid) => query.bind::<sql_types::Uuid, _>(uuid),
                BindValue::UuidArray(uuids) => {
                    query.bind::<sql_types::Array<sql_types::Uuid>, _>(uuids)
                }
                BindValue::Jsonb(json) => query.bind::<sql_types::Jsonb, _>(json),
            };
        }
        query
    }

    fn placeholder(&mut self, value: BindValue) -> String {
        self.binds.push(value);
        format!("${}", self.binds.len())
    }

    fn fragment(&mut self, predicate: &TaskPredicate, alias: &str) -> String {
        match predicate {
            TaskPredicate::Nothing => "FALSE".to_owned(),
            TaskPredicate::InWorkspace(workspace_id) => {
                let param = self.placeholder(BindValue::Uuid(workspace_id.into_inner()));
                format!("{alias}.workspace_id = {param}")
            }
            TaskPredicate::NotDeleted => format!("{alias}.deleted_at IS NULL"),
            TaskPredicate::NotArchived => format!("NOT {alias}.is_archived"),
            TaskPredicate::TopLevel => format!("{alias}.parent_id IS NULL"),
            TaskPredicate::ChildOf(parent_id) => {
                let param = self.placeholder(BindValue::Uuid(parent_id.into_inner()));
                format!("COALESCE({alias}.parent_id = {param}, FALSE)")
            }
            TaskPredicate::AssignedToInternalUser => {
                format!("{alias}.assignee_internal_user_id IS NOT NULL")
            }
            TaskPredicate::Unassigned => format!(
                "({alias}.assignee_internal_user_id IS NULL \
                 AND {alias}.assignee_client_id IS NULL \
                 AND {alias}.assignee_company_id IS NULL)"
            ),
            TaskPredicate::AssignedToClient {
                client_id,
                company_id,
            } => {
                let client = self.placeholder(BindValue::Uuid(client_id.into_inner()));
                let company = self.placeholder(BindValue::Uuid(company_id.into_inner()));
                format!(
                    "COALESCE({alias}.assignee_client_id = {client} \
                     AND {alias}.assignee_company_id = {company}, FALSE)"
                )
            }
            TaskPredicate::AssignedToCompany(company_id) => {
                let company = self.placeholder(BindValue::Uuid(company_id.into_inner()));
                format!(
                    "COALESCE({alias}.assignee_client_id IS NULL \
                     AND {alias}.assignee_company_id = {company}, FALSE)"
                )
            }
            TaskPredicate::AssigneeCompanyIn(companies) => {
                let param = self.placeholder(BindValue::UuidArray(
                    companies.iter().map(|id| id.into_inner()).collect(),
                ));
                format!("COALESCE({alias}.assignee_company_id = ANY({param}), FALSE)")
            }
            TaskPredicate::ViewerGrantFor {
                client_id,
                company_id,
            } => {
                let exact = self.placeholder(BindValue::Jsonb(json!([{
                    "client_id": client_id.into_inner(),
                    "company_id": company_id.into_inner(),
                }])));
                let whole_company = self.placeholder(BindValue::Jsonb(json!([{
                    "client_id": Value::Null,
                    "company_id": company_id.into_inner(),
                }])));
                format!("({alias}.viewers @> {exact} OR {alias}.viewers @> {whole_company})")
            }
            TaskPredicate::ViewerGrantCompanyIn(companies) => {
                let param = self.placeholder(BindValue::UuidArray(
                    companies.iter().map(|id| id.into_inner()).collect(),
                ));
                format!(
                    "EXISTS (SELECT 1 FROM jsonb_array_elements({alias}.viewers) AS viewer_grant \
                     WHERE (viewer_grant->>'company_id')::uuid = ANY({param}))"
                )
            }
            TaskPredicate::Parent(inner) if alias == TASK_ALIAS => {
                let inner_sql = self.fragment(inner, PARENT_ALIAS);
                format!("({PARENT_ALIAS}.id IS NOT NULL AND {inner_sql})")
            }
            TaskPredicate::Parent(_) => "FALSE".to_owned(),
            TaskPredicate::Not(inner) => format!("NOT ({})", self.fragment(inner, alias)),
            TaskPredicate::All(predicates) => self.join(predicates, alias, " AND ", "TRUE"),
            TaskPredicate::Any(predicates) => self.join(predicates, alias, " OR ", "FALSE"),
        }
    }

    fn join(
        &mut self,
        predicates: &[TaskPredicate],
        alias: &str,
        separator: &str,
        empty: &str,
    ) -> String {
        if predicates.is_empty() {
            return empty.to_owned();
        }
        let mut sql = String::from("(");
        for (index, predicate) in predicates.iter().enumerate() {
            if index > 0 {
                sql.push_str(separator);
            }
            let fragment = self.fragment(predicate, alias);
            sql.push_str(&fragment);
        }
        sql.push(')');
        sql
    }
}
