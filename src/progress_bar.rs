use indicatif::{MultiProgress, ProgressBar as InnerProgressBar, ProgressStyle};

#[derive(Debug, Clone)]
pub struct ProgressBar {
    inner: InnerProgressBar,
}

impl ProgressBar {
    pub fn new(mp: &MultiProgress, prefix: &str, len: usize) -> Self {
        let template = "{prefix:>.bold} [{bar:30.cyan/blue}] {pos}/{len}: {msg}";

        let inner = mp.add(InnerProgressBar::new(len as u64));

        inner.set_style(
            ProgressStyle::with_template(template)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>"),
        );
        inner.set_prefix(prefix.to_string());

        inner.tick();

        Self { inner }
    }

    pub fn set_msg(&self, msg: impl Into<String>) {
        self.inner.set_message(msg.into());
    }

    pub fn inc(&self) {
        self.inner.inc(1);
    }

    pub fn finish(&self) {
        self.inner.finish_and_clear();
    }
}
