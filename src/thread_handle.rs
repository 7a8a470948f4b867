//! The thread-handle collaborator contract (spec §6): joinable, movable,
//! with `set_name` truncated to 15 bytes (the `pthread_setname_np` limit
//! the original C++ library was tuned against).

const MAX_NAME_LEN: usize = 15;

/// A joinable worker thread with a short, truncated name.
#[derive(Debug)]
pub struct ThreadHandle {
    inner: Option<std::thread::JoinHandle<()>>,
    name: String,
}

impl ThreadHandle {
    pub fn spawn(name: impl Into<String>, body: impl FnOnce() + Send + 'static) -> Self {
        let name = truncate_name(name.into());
        let builder = std::thread::Builder::new().name(name.clone());
        let inner = builder.spawn(body).expect("failed to spawn highway worker thread");
        Self {
            inner: Some(inner),
            name,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn join(mut self) -> std::thread::Result<()> {
        self.inner
            .take()
            .expect("thread handle already joined")
            .join()
    }

    pub fn is_finished(&self) -> bool {
        self.inner
            .as_ref()
            .map(|h| h.is_finished())
            .unwrap_or(true)
    }
}

fn truncate_name(name: String) -> String {
    if name.len() <= MAX_NAME_LEN {
        return name;
    }
    let mut truncated = String::with_capacity(MAX_NAME_LEN);
    for ch in name.chars() {
        if truncated.len() + ch.len_utf8() > MAX_NAME_LEN {
            break;
        }
        truncated.push(ch);
    }
    truncated
}
