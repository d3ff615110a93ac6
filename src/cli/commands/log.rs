//! The `log` command.

use crate::cli::args::{LogArgs, OutputFormat};
use crate::error::RepsyncError;
use crate::features::interceptor::WriteInterceptor;
use crate::features::sync::{Operation, WorkoutLog};
use crate::output::format_submission;

use super::Context;

/// Submit a workout through the interceptor.
///
/// # Errors
///
/// Returns an error if the server rejects the workout, or if it could not be
/// delivered and could not be queued either.
pub async fn log(ctx: &Context, args: LogArgs, format: OutputFormat) -> Result<String, RepsyncError> {
    let exercise = args.exercise.trim();
    if exercise.is_empty() {
        return Err(RepsyncError::Config("exercise must not be empty".to_string()));
    }

    let operation = Operation::LogWorkout(WorkoutLog {
        exercise: exercise.to_string(),
        amount: args.amount,
        sets: args.sets,
        note: args.note,
    });
    let description = operation.describe();

    let interceptor = WriteInterceptor::new(
        ctx.open_store()?,
        ctx.transport()?,
        ctx.credentials()?,
        ctx.background(),
    );
    let submission = interceptor.submit(operation).await?;

    format_submission(&submission, &description, format)
}
