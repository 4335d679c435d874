use crate::analysis::{Analyzer, DatasetReport, save_results};
use crate::config::Config;
use crate::dataset::Dataset;
use crate::summary;
use anyhow::{Context, Result, bail};
use glob::glob;
use std::{
    fs,
    path::{Path, PathBuf},
};

pub struct Manager {
    work_dir: PathBuf,
    cfg: Config,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(work_dir: P) -> Result<Self> {
        let work_dir = work_dir.as_ref().to_path_buf();

        let cfg =
            Config::from_file(work_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { work_dir, cfg })
    }

    /// Analyze every dataset and write its results and text summary.
    ///
    /// A dataset that fails is logged and skipped; the command fails once all
    /// the others have been processed.
    pub fn analyze(&self) -> Result<()> {
        let results_dir = self.results_dir();
        fs::create_dir_all(&results_dir)
            .with_context(|| format!("failed to create {results_dir:?}"))?;

        let format = self.cfg.output.format;
        let n_failed = self.for_each_dataset(|file, report| {
            let stem = file_stem(file)?;

            let results_file = results_dir.join(format!("{stem}.{}", format.extension()));
            save_results(report, &results_file, format).context("failed to save results")?;

            let summary_file = results_dir.join(format!("{stem}.txt"));
            fs::write(&summary_file, summary::render(report))
                .with_context(|| format!("failed to write {summary_file:?}"))?;

            log::info!("wrote {results_file:?} and {summary_file:?}");
            Ok(())
        })?;

        if n_failed > 0 {
            bail!("failed to analyze {n_failed} datasets");
        }
        Ok(())
    }

    /// Print the text summary of every dataset to stdout.
    pub fn summarize(&self) -> Result<()> {
        let n_failed = self.for_each_dataset(|_, report| {
            print!("{}", summary::render(report));
            Ok(())
        })?;

        if n_failed > 0 {
            bail!("failed to summarize {n_failed} datasets");
        }
        Ok(())
    }

    /// Remove the results directory.
    pub fn clean(&self) -> Result<()> {
        let results_dir = self.results_dir();
        if !results_dir.exists() {
            log::info!("nothing to clean in {:?}", self.work_dir);
            return Ok(());
        }
        fs::remove_dir_all(&results_dir)
            .with_context(|| format!("failed to remove {results_dir:?}"))?;
        log::info!("removed {results_dir:?}");
        Ok(())
    }

    /// Run `action` on the report of every dataset file and count failures.
    fn for_each_dataset<F>(&self, mut action: F) -> Result<usize>
    where
        F: FnMut(&Path, &DatasetReport) -> Result<()>,
    {
        let files = self.dataset_files().context("failed to list dataset files")?;
        if files.is_empty() {
            bail!("no dataset files in {:?}", self.datasets_dir());
        }

        let mut n_failed = 0;
        for file in &files {
            log::info!("analyzing {file:?}");
            let result = self
                .analyze_file(file)
                .and_then(|report| action(file, &report));
            if let Err(error) = result {
                log::error!("{file:?}: {error:#}");
                n_failed += 1;
            }
        }

        Ok(n_failed)
    }

    fn analyze_file(&self, file: &Path) -> Result<DatasetReport> {
        let dataset = Dataset::from_file(file).context("failed to load dataset")?;
        log::info!(
            "loaded dataset {:?} with {} series",
            dataset.name,
            dataset.series.len()
        );

        let analyzer = Analyzer::new(&self.cfg.analysis, dataset);
        analyzer.report().context("failed to analyze dataset")
    }

    fn dataset_files(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.datasets_dir().join("*.toml");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let mut files: Vec<_> = glob(pattern)
            .context("failed to glob dataset files")?
            .filter_map(Result::ok)
            .filter(|p| p.is_file())
            .collect();
        files.sort();
        Ok(files)
    }

    fn datasets_dir(&self) -> PathBuf {
        self.work_dir.join("datasets")
    }

    fn results_dir(&self) -> PathBuf {
        self.work_dir.join("results")
    }
}

fn file_stem(file: &Path) -> Result<&str> {
    file.file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("invalid file name {file:?}"))
}
