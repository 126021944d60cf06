//! Diesel table definitions for task lifecycle storage.

diesel::table! {
    /// Task records; status is the canonical lifecycle state.
    tasks (id) {
        /// Internal task identifier.
        id -> Uuid,
        /// Short task title.
        title -> Varchar,
        /// Long-form description.
        description -> Text,
        /// Acceptance requirements.
        requirements -> Text,
        /// Task value in wei, stored as a decimal string (exceeds BIGINT).
        value_in_wei -> Varchar,
        /// Completion deadline.
        deadline -> Timestamptz,
        /// Whether a discounted overdue period is permitted.
        allow_overdue -> Bool,
        /// Lifecycle status.
        status -> Varchar,
        /// Creator (client) identifier.
        creator_id -> Uuid,
        /// Contract-side task identifier, set after escrow funding.
        contract_task_id -> Nullable<Int8>,
        /// Funding transaction hash, set after escrow funding.
        contract_tx_hash -> Nullable<Varchar>,
        /// Submitted pull request number, set by webhook ingestion.
        pull_request_number -> Nullable<Int8>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
        /// Soft-deletion timestamp.
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Active developer assignment, at most one per task.
    developer_assignments (task_id) {
        /// Task the assignment belongs to.
        task_id -> Uuid,
        /// Developer wallet address.
        wallet_address -> Varchar,
        /// Developer GitHub login.
        github_login -> Varchar,
        /// Application timestamp.
        applied_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only audit rows, one per on-chain operation attempt.
    escrow_transactions (id) {
        /// Record identifier.
        id -> Uuid,
        /// Task the attempt belongs to.
        task_id -> Uuid,
        /// Operation kind (create/accept/complete/cancel).
        kind -> Varchar,
        /// Attempt outcome (confirmed/failed).
        outcome -> Varchar,
        /// Value attached to the operation, as a decimal string.
        value_in_wei -> Varchar,
        /// Transaction hash, when one was obtained.
        tx_hash -> Nullable<Varchar>,
        /// Chain identifier.
        network_id -> Int8,
        /// Recording timestamp.
        recorded_at -> Timestamptz,
    }
}

diesel::table! {
    /// Mirror of the externally provisioned task repository.
    workspaces (task_id) {
        /// Task the workspace belongs to.
        task_id -> Uuid,
        /// Repository name.
        repository_name -> Varchar,
        /// Repository browser URL.
        repository_url -> Varchar,
        /// Host-side repository identifier.
        github_repo_id -> Int8,
        /// Provisioning timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Reviewer feedback appended by revision requests.
    review_feedback (id) {
        /// Record identifier.
        id -> Uuid,
        /// Task the feedback belongs to.
        task_id -> Uuid,
        /// Feedback text.
        feedback -> Text,
        /// Recording timestamp.
        recorded_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    tasks,
    developer_assignments,
    escrow_transactions,
    workspaces,
    review_feedback,
);
