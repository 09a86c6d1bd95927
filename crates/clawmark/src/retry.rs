// SPDX-FileCopyrightText: 2026 Clawmark Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `clawmark retry`: put failed or exhausted dispatches back in the queue.

use clawmark_core::{ClawmarkError, ResetFilter};

use crate::app::App;

pub async fn run_retry(app: App, filter: ResetFilter) -> Result<(), ClawmarkError> {
    let count = app.engine.reset(&filter).await?;
    match count {
        0 => println!("no failed or exhausted dispatches matched"),
        1 => println!("1 dispatch reset to pending"),
        n => println!("{n} dispatches reset to pending"),
    }
    app.store.close().await
}
