//! # Task Repository
//!
//! Import/export jobs. Updates and deletes are guarded: they only apply to a
//! task that is still `published`, so a stale copy cannot overwrite a task
//! that was archived in the meantime.

use ledgerline_core::filter::TaskFilter;
use ledgerline_core::query::Predicate;
use ledgerline_core::{Status, Task};

use super::{Entity, Repository, Table};
use crate::cache::PREFIX_TASK;
use crate::sql::SqlValue;

pub type TaskRepository = Repository<Task>;

impl Table for Task {
    const TABLE: &'static str = "tasks";

    const COLUMNS: &'static [&'static str] = &[
        "id",
        "tenant_id",
        "environment_id",
        "task_type",
        "entity_type",
        "file_url",
        "file_name",
        "task_status",
        "total_records",
        "processed_records",
        "successful_records",
        "failed_records",
        "error_summary",
        "started_at",
        "completed_at",
        "failed_at",
        "status",
        "created_at",
        "updated_at",
        "created_by",
        "updated_by",
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.id.clone().into(),
            self.tenant_id.clone().into(),
            self.environment_id.clone().into(),
            self.task_type.as_str().into(),
            self.entity_type.clone().into(),
            self.file_url.clone().into(),
            self.file_name.clone().into(),
            self.task_status.as_str().into(),
            self.total_records.into(),
            self.processed_records.into(),
            self.successful_records.into(),
            self.failed_records.into(),
            self.error_summary.clone().into(),
            self.started_at.into(),
            self.completed_at.into(),
            self.failed_at.into(),
            self.status.into(),
            self.created_at.into(),
            self.updated_at.into(),
            self.created_by.clone().into(),
            self.updated_by.clone().into(),
        ]
    }
}

impl Entity for Task {
    type Filter = TaskFilter;

    const NAME: &'static str = "task";
    const ID_DETAIL: &'static str = "task_id";
    const CACHE_PREFIX: &'static str = PREFIX_TASK;
    const UPDATE_GUARD: Option<Status> = Some(Status::Published);

    fn field_name(field: &str) -> Option<&'static str> {
        Some(match field {
            "id" => "id",
            "task_type" => "task_type",
            "entity_type" => "entity_type",
            "file_name" => "file_name",
            "task_status" => "task_status",
            "total_records" => "total_records",
            "processed_records" => "processed_records",
            "successful_records" => "successful_records",
            "failed_records" => "failed_records",
            "started_at" => "started_at",
            "completed_at" => "completed_at",
            "failed_at" => "failed_at",
            "status" => "status",
            "created_at" => "created_at",
            "updated_at" => "updated_at",
            "created_by" => "created_by",
            "updated_by" => "updated_by",
            _ => return None,
        })
    }

    fn update_values(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            ("task_status", self.task_status.as_str().into()),
            ("file_name", self.file_name.clone().into()),
            ("total_records", self.total_records.into()),
            ("processed_records", self.processed_records.into()),
            ("successful_records", self.successful_records.into()),
            ("failed_records", self.failed_records.into()),
            ("error_summary", self.error_summary.clone().into()),
            ("started_at", self.started_at.into()),
            ("completed_at", self.completed_at.into()),
            ("failed_at", self.failed_at.into()),
            ("status", self.status.into()),
            ("updated_at", self.updated_at.into()),
            ("updated_by", self.updated_by.clone().into()),
        ]
    }

    fn filter_predicates(filter: &TaskFilter) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(task_type) = filter.task_type {
            predicates.push(Predicate::eq("task_type", task_type.as_str()));
        }
        if let Some(entity_type) = &filter.entity_type {
            predicates.push(Predicate::eq("entity_type", entity_type));
        }
        if let Some(task_status) = filter.task_status {
            predicates.push(Predicate::eq("task_status", task_status.as_str()));
        }
        if let Some(created_by) = &filter.created_by {
            predicates.push(Predicate::eq("created_by", created_by));
        }
        predicates
    }
}
