// Simplified Diesel schema shared by the SQLite and Postgres backends.
// Tablas: projects, project_steps, project_prompts
use diesel::allow_tables_to_appear_in_same_query;
diesel::table! {
    projects (id) {
        id -> Text,
        user_id -> Text,
        name -> Text,
        description -> Text,
        tech_stack -> Text,
        status -> Text,
        is_template -> Bool,
        created_at_ts -> BigInt,
        updated_at_ts -> BigInt,
    }
}
diesel::table! {
    project_steps (id) {
        id -> Text,
        project_id -> Text,
        title -> Text,
        description -> Text,
        order -> Integer,
        is_completed -> Bool,
        expected_output -> Nullable<Text>,
        actual_output -> Nullable<Text>,
        notes -> Nullable<Text>,
        created_at_ts -> BigInt,
        updated_at_ts -> BigInt,
    }
}
diesel::table! {
    project_prompts (id) {
        id -> Text,
        project_id -> Text,
        step_id -> Nullable<Text>,
        title -> Text,
        content -> Text,
        response -> Nullable<Text>,
        variables -> Text,
        version -> Integer,
        order -> Integer,
        is_template -> Bool,
        created_at_ts -> BigInt,
        updated_at_ts -> BigInt,
    }
}
allow_tables_to_appear_in_same_query!(projects, project_steps, project_prompts);
