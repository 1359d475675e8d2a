//! JSON writer pool

use crate::config::ExportConfig;
use crate::core::export::{ChannelSink, WorkQueue};
use crate::domain::{Bundle, CityKmlError, Result};
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;

/// Writer pool settings
#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub output_dir: PathBuf,
    pub writers: usize,
    /// Bundles buffered between workers and writers
    pub capacity: usize,
    pub dry_run: bool,
}

impl OutputSettings {
    pub fn from_config(config: &ExportConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            writers: config.writers,
            capacity: config.queue_capacity,
            dry_run: config.dry_run,
        }
    }
}

/// Counters of one or more writers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub written: usize,
    pub failed: usize,
    pub bytes: u64,
}

impl WriterStats {
    fn merge(&mut self, other: WriterStats) {
        self.written += other.written;
        self.failed += other.failed;
        self.bytes += other.bytes;
    }
}

/// Location of a bundle's document below `output_dir`
pub fn bundle_path(output_dir: &Path, bundle: &Bundle) -> PathBuf {
    let prefix = if bundle.placemarks.first().is_some_and(|p| p.group_member) {
        "member_"
    } else {
        ""
    };
    output_dir.join(bundle.class.as_str()).join(format!(
        "{prefix}{}_{}.json",
        bundle.display_form.as_str(),
        bundle.representative_id
    ))
}

pub struct OutputWriterPool {
    handles: Vec<JoinHandle<WriterStats>>,
}

impl OutputWriterPool {
    /// Starts the writers and returns the sink feeding them
    ///
    /// The writers stop once every clone of the sink has been dropped and
    /// the buffered bundles are written.
    ///
    /// # Errors
    ///
    /// Returns `CityKmlError::Io` if the output directory cannot be created.
    pub async fn start(settings: &OutputSettings) -> Result<(ChannelSink, Self)> {
        if !settings.dry_run {
            tokio::fs::create_dir_all(&settings.output_dir)
                .await
                .map_err(|e| {
                    CityKmlError::Io(format!(
                        "Failed to create output directory {}: {}",
                        settings.output_dir.display(),
                        e
                    ))
                })?;
        }

        let (sender, queue) = WorkQueue::bounded(settings.capacity);
        let handles = (0..settings.writers.max(1))
            .map(|id| {
                let queue = queue.clone();
                let output_dir = settings.output_dir.clone();
                let dry_run = settings.dry_run;
                tokio::spawn(async move { run_writer(id, queue, output_dir, dry_run).await })
            })
            .collect();

        tracing::info!(
            writers = settings.writers,
            output_dir = %settings.output_dir.display(),
            dry_run = settings.dry_run,
            "Output writers started"
        );
        Ok((ChannelSink::new(sender), Self { handles }))
    }

    /// Waits for the writers and sums their counters
    pub async fn join(self) -> WriterStats {
        let mut total = WriterStats::default();
        for joined in futures::future::join_all(self.handles).await {
            match joined {
                Ok(stats) => total.merge(stats),
                Err(e) => tracing::error!(error = %e, "Output writer task did not complete"),
            }
        }
        total
    }
}

async fn run_writer(
    id: usize,
    queue: WorkQueue<Bundle>,
    output_dir: PathBuf,
    dry_run: bool,
) -> WriterStats {
    let mut stats = WriterStats::default();

    while let Some(bundle) = queue.take().await {
        match write_bundle(&output_dir, &bundle, dry_run).await {
            Ok(bytes) => {
                stats.written += 1;
                stats.bytes += bytes;
            }
            Err(e) => {
                tracing::error!(
                    writer = id,
                    representative_id = %bundle.representative_id,
                    class = %bundle.class,
                    error = %e,
                    "Failed to write bundle"
                );
                stats.failed += 1;
            }
        }
    }

    tracing::debug!(writer = id, written = stats.written, failed = stats.failed, "Writer stopped");
    stats
}

async fn write_bundle(output_dir: &Path, bundle: &Bundle, dry_run: bool) -> Result<u64> {
    let document = serde_json::to_vec_pretty(bundle)?;
    let bytes = document.len() as u64;

    if dry_run {
        tracing::debug!(
            representative_id = %bundle.representative_id,
            bytes = bytes,
            "Dry run: bundle not written"
        );
        return Ok(bytes);
    }

    let path = bundle_path(output_dir, bundle);
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, document).await?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::BundleSink;
    use crate::domain::{
        CityObjectClass, CityObjectId, DisplayForm, ExportedObject, GmlId, Lod, Placemark,
        SceneGeometry, TextureSet,
    };

    fn bundle(id: i64, group_member: bool) -> Bundle {
        Bundle::single(ExportedObject {
            class: CityObjectClass::Building,
            display_form: DisplayForm::Footprint,
            lod: Lod::new(1).unwrap(),
            geometry: SceneGeometry::default(),
            textures: TextureSet::default(),
            placemark: Placemark {
                object_id: CityObjectId::new(id).unwrap(),
                name: GmlId::new(format!("BLDG_{id}")).unwrap(),
                description: Some("<b>x</b>".to_string()),
                group_member,
            },
        })
    }

    fn settings(dir: &Path, dry_run: bool) -> OutputSettings {
        OutputSettings {
            output_dir: dir.to_path_buf(),
            writers: 2,
            capacity: 4,
            dry_run,
        }
    }

    #[test]
    fn test_bundle_path() {
        let dir = Path::new("/out");
        assert_eq!(
            bundle_path(dir, &bundle(12, false)),
            PathBuf::from("/out/building/footprint_12.json")
        );
        assert_eq!(
            bundle_path(dir, &bundle(12, true)),
            PathBuf::from("/out/building/member_footprint_12.json")
        );
    }

    #[tokio::test]
    async fn test_writes_one_document_per_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let (sink, pool) = OutputWriterPool::start(&settings(dir.path(), false))
            .await
            .unwrap();

        for id in 1..=5 {
            sink.send(bundle(id, false)).await.unwrap();
        }
        drop(sink);

        let stats = pool.join().await;
        assert_eq!(stats.written, 5);
        assert_eq!(stats.failed, 0);

        let stored = std::fs::read_to_string(dir.path().join("building/footprint_3.json")).unwrap();
        let parsed: Bundle = serde_json::from_str(&stored).unwrap();
        assert_eq!(parsed, bundle(3, false));
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("export");
        let (sink, pool) = OutputWriterPool::start(&settings(&output, true))
            .await
            .unwrap();

        sink.send(bundle(1, false)).await.unwrap();
        drop(sink);

        let stats = pool.join().await;
        assert_eq!(stats.written, 1);
        assert!(stats.bytes > 0);
        assert!(!output.exists());
    }
}
