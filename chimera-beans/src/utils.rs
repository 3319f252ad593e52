//! Utility functions for the container
//!
//! Bean naming helpers and the bookkeeping used to detect circular creation.

/// Naming convention utilities for bean names
pub mod naming {
    /// Derives the default bean name from a type name.
    ///
    /// The module path is dropped and the first character lower-cased, so
    /// `app::service::UserService` becomes `userService`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chimera_beans::utils::naming::default_bean_name;
    ///
    /// assert_eq!(default_bean_name("app::service::UserService"), "userService");
    /// assert_eq!(default_bean_name("A"), "a");
    /// assert_eq!(default_bean_name(""), "");
    /// ```
    pub fn default_bean_name(type_name: &str) -> String {
        let simple = type_name.rsplit("::").next().unwrap_or(type_name);
        let mut chars = simple.chars();
        match chars.next() {
            None => String::new(),
            Some(first) => {
                let mut result = String::with_capacity(simple.len());
                result.extend(first.to_lowercase());
                result.push_str(chars.as_str());
                result
            }
        }
    }
}

/// Dependency resolution utilities
pub mod dependency {
    use std::collections::HashMap;
    use std::thread::{self, ThreadId};

    use parking_lot::Mutex;

    /// Tracks beans currently being created to detect circular dependencies.
    ///
    /// Creation chains are kept per thread: two threads creating the same
    /// bean concurrently is not a cycle, a thread re-entering a bean it is
    /// already creating is.
    #[derive(Debug, Default)]
    pub struct CreationTracker {
        chains: Mutex<HashMap<ThreadId, Vec<String>>>,
    }

    impl CreationTracker {
        /// Creates a new empty creation tracker.
        pub fn new() -> Self {
            Self::default()
        }

        /// Checks if the current thread is creating the bean.
        pub fn is_creating(&self, name: &str) -> bool {
            self.chains
                .lock()
                .get(&thread::current().id())
                .map(|chain| chain.iter().any(|n| n == name))
                .unwrap_or(false)
        }

        /// Marks a bean as being created by the current thread.
        ///
        /// Returns the guard that clears the mark on drop, or the creation
        /// chain ending with `name` when the bean is already being created.
        pub fn start_creating<'a>(&'a self, name: &str) -> Result<CreationGuard<'a>, Vec<String>> {
            let mut chains = self.chains.lock();
            let chain = chains.entry(thread::current().id()).or_default();
            if chain.iter().any(|n| n == name) {
                let mut cycle = chain.clone();
                cycle.push(name.to_string());
                return Err(cycle);
            }
            chain.push(name.to_string());
            Ok(CreationGuard {
                tracker: self,
                name: name.to_string(),
            })
        }

        /// Gets a snapshot of the beans the current thread is creating, outermost first.
        pub fn current_creating(&self) -> Vec<String> {
            self.chains
                .lock()
                .get(&thread::current().id())
                .cloned()
                .unwrap_or_default()
        }

        fn finish_creating(&self, name: &str) {
            let mut chains = self.chains.lock();
            let id = thread::current().id();
            if let Some(chain) = chains.get_mut(&id) {
                if let Some(pos) = chain.iter().rposition(|n| n == name) {
                    chain.remove(pos);
                }
                if chain.is_empty() {
                    chains.remove(&id);
                }
            }
        }
    }

    /// Clears the creation mark when dropped, on success and on error alike.
    #[derive(Debug)]
    pub struct CreationGuard<'a> {
        tracker: &'a CreationTracker,
        name: String,
    }

    impl Drop for CreationGuard<'_> {
        fn drop(&mut self) {
            self.tracker.finish_creating(&self.name);
        }
    }
}
