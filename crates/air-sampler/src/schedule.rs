use std::convert::Infallible;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Unit of recurring work
pub trait Task {
    type Error;

    fn run(&mut self) -> impl Future<Output = Result<(), Self::Error>>;
}

/// Runs `task` to completion then waits `interval`, forever. There is no
/// drift correction, the period is `interval` plus however long the task
/// took. Only returns if the task fails.
pub async fn repeat<T: Task>(interval: Duration, task: &mut T) -> Result<Infallible, T::Error> {
    loop {
        task.run().await?;
        sleep(interval).await;
    }
}
