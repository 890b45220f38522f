use std::collections::HashMap;

/// Load state of one image reference.
#[derive(Debug)]
enum ImageEntry<I> {
    Pending,
    Loaded(I),
    Failed,
}

/// Per-reference image memo. Each reference is queued for loading at most once; the
/// host drains the queue with [`ImageCache::take_requests`], loads asynchronously and
/// reports back through [`ImageCache::complete`]. Failures are remembered so the
/// renderer keeps drawing the fallback without retrying.
#[derive(Debug)]
pub struct ImageCache<I> {
    entries: HashMap<String, ImageEntry<I>>,
    queue: Vec<String>,
}

impl<I> Default for ImageCache<I> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            queue: Vec::new(),
        }
    }
}

impl<I> ImageCache<I> {
    /// Return the decoded image if ready, queueing a load on first sight.
    pub fn request(&mut self, src: &str) -> Option<&I> {
        if src.is_empty() {
            return None;
        }
        if !self.entries.contains_key(src) {
            self.entries.insert(src.to_string(), ImageEntry::Pending);
            self.queue.push(src.to_string());
            return None;
        }
        match self.entries.get(src) {
            Some(ImageEntry::Loaded(image)) => Some(image),
            _ => None,
        }
    }

    pub fn is_failed(&self, src: &str) -> bool {
        matches!(self.entries.get(src), Some(ImageEntry::Failed))
    }

    /// Queued references not yet handed to a loader.
    pub fn take_requests(&mut self) -> Vec<String> {
        std::mem::take(&mut self.queue)
    }

    pub fn has_requests(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Record a finished load. Returns `true` when the entry changed and a redraw is due.
    pub fn complete(&mut self, src: &str, result: Result<I, String>) -> bool {
        let entry = match result {
            Ok(image) => ImageEntry::Loaded(image),
            Err(error) => {
                tracing::warn!(src, %error, "image load failed; using fallback");
                ImageEntry::Failed
            }
        };
        match self.entries.get_mut(src) {
            Some(slot) if matches!(slot, ImageEntry::Pending) => {
                *slot = entry;
                true
            }
            // Late or duplicate completion for a settled entry.
            Some(_) => false,
            None => {
                self.entries.insert(src.to_string(), entry);
                true
            }
        }
    }
}
