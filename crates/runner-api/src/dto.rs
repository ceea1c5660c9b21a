// Storage row -> public contract DTO conversions. Kept here rather than in
// `runner-contracts` or `runner-storage` so neither needs to know about the
// other's shape.

use runner_contracts::{Run, StepRun};
use runner_storage::{RunRow, StepRunRow};

pub fn run_dto(row: RunRow) -> Run {
    Run {
        id: row.id,
        workflow_id: row.workflow_id,
        org_id: row.org_id,
        status: row.status(),
        error: row.error,
        triggered_by: row.triggered_by,
        created_at: row.created_at,
        started_at: row.started_at,
        finished_at: row.finished_at,
    }
}

pub fn step_dto(row: StepRunRow) -> StepRun {
    StepRun {
        id: row.id,
        run_id: row.run_id,
        node_id: row.node_id,
        status: row.status(),
        input_json: row.input_json,
        output_json: row.output_json,
        error: row.error,
        started_at: row.started_at,
        finished_at: row.finished_at,
    }
}
