use super::AppError;

/// One URL of a submitted batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub url: String,
    /// 1-based position inside the batch
    pub index: usize,
    /// Number of jobs in the batch
    pub total: usize,
}

impl DownloadJob {
    /// Builds the ordered job list for a batch of URLs.
    pub fn batch(urls: Vec<String>) -> Vec<DownloadJob> {
        let total = urls.len();
        urls.into_iter()
            .enumerate()
            .map(|(i, url)| DownloadJob {
                url,
                index: i + 1,
                total,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    CheckingPrereqs,
    Running,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Cancelled | Phase::Failed | Phase::Completed)
    }
}

/// Item counters scraped from the downloader output of the current job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemProgress {
    /// Set at most once per job
    pub total_items: Option<u32>,
    pub completed_items: u32,
    /// File name of the item being processed, without extension
    pub current_item: Option<String>,
}

impl ItemProgress {
    pub fn track_label(&self) -> String {
        if self.completed_items == 0 && self.total_items.is_none() && self.current_item.is_none() {
            return String::new();
        }

        let total = self
            .total_items
            .map(|t| t.to_string())
            .unwrap_or_else(|| "?".to_string());
        let mut label = format!("Track {}/{}", self.completed_items, total);
        if let Some(name) = &self.current_item {
            label.push_str(" - ");
            label.push_str(name);
        }
        label
    }
}

/// What a status sink gets to see after each change.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub phase: Phase,
    pub label: String,
    /// Overall progress across the batch, 0.0 to 1.0
    pub fraction: f32,
    pub track_label: String,
}

/// Progress model of a single run, owned by the runner.
#[derive(Debug, Clone)]
pub struct ProgressState {
    pub current_job_index: usize,
    pub total_jobs: usize,
    pub current_url: Option<String>,
    pub items: ItemProgress,
    pub per_job_fraction: f32,
    pub fraction_complete: f32,
    pub phase: Phase,
    message: Option<String>,
}

impl ProgressState {
    pub fn new(total_jobs: usize) -> Self {
        Self {
            current_job_index: 0,
            total_jobs,
            current_url: None,
            items: ItemProgress::default(),
            per_job_fraction: 0.0,
            fraction_complete: 0.0,
            phase: Phase::Idle,
            message: None,
        }
    }

    pub fn checking_prereqs(&mut self) {
        self.phase = Phase::CheckingPrereqs;
    }

    pub fn start_job(&mut self, job: &DownloadJob) {
        self.phase = Phase::Running;
        self.current_job_index = job.index;
        self.current_url = Some(job.url.clone());
        self.items = ItemProgress::default();
        self.per_job_fraction = 0.0;
        self.recompute();
    }

    /// Percent of the item currently downloading, 0 to 100.
    pub fn set_item_percent(&mut self, percent: f64) {
        self.per_job_fraction = (percent / 100.0).clamp(0.0, 1.0) as f32;
        self.recompute();
    }

    pub fn cancelling(&mut self) {
        if self.phase == Phase::Running {
            self.phase = Phase::Cancelling;
        }
    }

    /// Moves into the terminal phase matching `outcome`.
    pub fn finish(&mut self, outcome: &RunOutcome) {
        match outcome {
            RunOutcome::Completed => {
                self.phase = Phase::Completed;
                self.fraction_complete = 1.0;
            }
            RunOutcome::Cancelled => self.phase = Phase::Cancelled,
            RunOutcome::Failed(err) => {
                self.phase = Phase::Failed;
                self.message = Some(err.to_string());
            }
        }
    }

    fn recompute(&mut self) {
        if self.total_jobs == 0 {
            return;
        }
        let total = self.total_jobs as f32;
        let done_jobs = self.current_job_index.saturating_sub(1) as f32;
        let computed = (done_jobs / total + self.per_job_fraction / total).clamp(0.0, 1.0);
        // A new item starting at 0% must not pull the bar back.
        self.fraction_complete = self.fraction_complete.max(computed);
    }

    pub fn label(&self) -> String {
        match self.phase {
            Phase::Idle => String::new(),
            Phase::CheckingPrereqs => "Checking for FFmpeg...".to_string(),
            Phase::Running => format!(
                "Downloading: {} ({}/{})",
                self.current_url.as_deref().unwrap_or_default(),
                self.current_job_index,
                self.total_jobs
            ),
            Phase::Cancelling => "Cancelling...".to_string(),
            Phase::Cancelled => "Download cancelled".to_string(),
            Phase::Failed => self
                .message
                .clone()
                .unwrap_or_else(|| "Download failed".to_string()),
            Phase::Completed => "All downloads completed successfully!".to_string(),
        }
    }

    pub fn status(&self) -> StatusUpdate {
        StatusUpdate {
            phase: self.phase,
            label: self.label(),
            fraction: self.fraction_complete,
            track_label: self.items.track_label(),
        }
    }
}

/// Terminal result of a run.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed,
    Cancelled,
    Failed(AppError),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jobs(n: usize) -> Vec<DownloadJob> {
        DownloadJob::batch((1..=n).map(|i| format!("https://example.com/{}", i)).collect())
    }

    #[test]
    fn test_batch_indices() {
        let jobs = jobs(3);
        assert_eq!(jobs[0].index, 1);
        assert_eq!(jobs[2].index, 3);
        assert!(jobs.iter().all(|j| j.total == 3));
    }

    #[test]
    fn test_fraction_weighted_by_job() {
        let jobs = jobs(2);
        let mut state = ProgressState::new(2);
        state.start_job(&jobs[0]);
        state.set_item_percent(50.0);
        assert!((state.fraction_complete - 0.25).abs() < 1e-6);

        state.start_job(&jobs[1]);
        assert!((state.fraction_complete - 0.5).abs() < 1e-6);
        state.set_item_percent(100.0);
        assert!((state.fraction_complete - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fraction_never_decreases() {
        let jobs = jobs(1);
        let mut state = ProgressState::new(1);
        state.start_job(&jobs[0]);
        state.set_item_percent(80.0);
        // next item of the same playlist restarts at a low percentage
        state.set_item_percent(3.0);
        assert!((state.fraction_complete - 0.8).abs() < 1e-6);
        assert!((state.per_job_fraction - 0.03).abs() < 1e-6);
    }

    #[test]
    fn test_percent_is_clamped() {
        let jobs = jobs(1);
        let mut state = ProgressState::new(1);
        state.start_job(&jobs[0]);
        state.set_item_percent(250.0);
        assert_eq!(state.fraction_complete, 1.0);
    }

    #[test]
    fn test_labels() {
        let jobs = jobs(2);
        let mut state = ProgressState::new(2);
        state.start_job(&jobs[1]);
        assert_eq!(state.label(), "Downloading: https://example.com/2 (2/2)");

        state.cancelling();
        assert_eq!(state.phase, Phase::Cancelling);
        state.finish(&RunOutcome::Cancelled);
        assert_eq!(state.label(), "Download cancelled");
        assert!(state.status().phase.is_terminal());
    }

    #[test]
    fn test_completed_fills_the_bar() {
        let mut state = ProgressState::new(3);
        state.finish(&RunOutcome::Completed);
        assert_eq!(state.fraction_complete, 1.0);
        assert_eq!(state.phase, Phase::Completed);
    }

    #[test]
    fn test_start_job_resets_item_counters() {
        let jobs = jobs(2);
        let mut state = ProgressState::new(2);
        state.start_job(&jobs[0]);
        state.items = ItemProgress {
            total_items: Some(3),
            completed_items: 3,
            current_item: Some("03 - Last".to_string()),
        };
        state.set_item_percent(100.0);

        state.start_job(&jobs[1]);
        assert_eq!(state.items, ItemProgress::default());
        assert_eq!(state.per_job_fraction, 0.0);
        assert_eq!(state.status().track_label, "");
    }

    #[test]
    fn test_track_label() {
        let mut items = ItemProgress::default();
        assert_eq!(items.track_label(), "");

        items.completed_items = 1;
        assert_eq!(items.track_label(), "Track 1/?");

        items.total_items = Some(12);
        items.current_item = Some("02 - Intro".to_string());
        assert_eq!(items.track_label(), "Track 1/12 - 02 - Intro");
    }
}
