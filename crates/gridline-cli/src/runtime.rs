// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use gridline_app::Record;
use gridline_source::{Loader, SourceLocation};
use tracing::info;

pub struct SourceRuntime {
    loader: Loader,
    location: SourceLocation,
}

impl SourceRuntime {
    pub fn new(loader: Loader, location: SourceLocation) -> Self {
        Self { loader, location }
    }
}

impl gridline_tui::GridRuntime for SourceRuntime {
    fn load_records(&mut self, force: bool) -> Result<Vec<Record>> {
        let records = if force {
            self.loader.refetch(&self.location)?
        } else {
            self.loader.load(&self.location)?
        };
        info!(source = %self.location, count = records.len(), force, "records loaded");
        Ok(records)
    }

    fn source_label(&self) -> String {
        self.location.to_string()
    }
}

/// Serves the seeded demo dataset. The seed is fixed, so a forced reload
/// returns the same rows.
#[derive(Debug, Default)]
pub struct DemoRuntime;

impl gridline_tui::GridRuntime for DemoRuntime {
    fn load_records(&mut self, _force: bool) -> Result<Vec<Record>> {
        Ok(gridline_testkit::demo_records())
    }

    fn source_label(&self) -> String {
        "demo".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::{DemoRuntime, SourceRuntime};
    use anyhow::Result;
    use gridline_source::{Loader, ResponseCache, SourceLocation};
    use gridline_testkit::{DEMO_RECORD_COUNT, DirectoryFaker, write_records_json};
    use gridline_tui::GridRuntime;
    use std::time::Duration;

    #[test]
    fn source_runtime_loads_and_refetches_file() -> Result<()> {
        let records = DirectoryFaker::new(21).records(4);
        let (_dir, path) = write_records_json(&records)?;
        let location = SourceLocation::File(path.clone());
        let loader = Loader::new(Duration::from_secs(1), ResponseCache::default())?;
        let mut runtime = SourceRuntime::new(loader, location);

        assert_eq!(runtime.load_records(false)?, records);

        let mut changed = records.clone();
        changed.truncate(2);
        std::fs::write(&path, serde_json::to_vec(&changed)?)?;
        // Cached until forced.
        assert_eq!(runtime.load_records(false)?.len(), 4);
        assert_eq!(runtime.load_records(true)?, changed);
        assert!(runtime.source_label().ends_with("records.json"));
        Ok(())
    }

    #[test]
    fn demo_runtime_serves_expanded_dataset() -> Result<()> {
        let mut runtime = DemoRuntime;
        let first = runtime.load_records(false)?;
        assert_eq!(first.len(), DEMO_RECORD_COUNT);
        assert_eq!(runtime.load_records(true)?, first);
        assert_eq!(runtime.source_label(), "demo");
        Ok(())
    }
}
