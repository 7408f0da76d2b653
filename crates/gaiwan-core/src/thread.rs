//! Conversation thread reconstruction.
//!
//! A thread is a connected component of the reply relation. A post joins its
//! parent when the parent is in the corpus, and every post replying to the
//! same parent identifier joins its siblings even when the parent itself is
//! missing, so a conversation whose root was never archived still hangs
//! together.

use std::collections::HashMap;

use petgraph::unionfind::UnionFind;
use tracing::instrument;

use crate::model::post::Post;

/// Dense thread assignment for every post in a corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Threads {
    /// Thread id per post index.
    thread_of: Vec<usize>,
    /// Post indices per thread id, ascending.
    members: Vec<Vec<usize>>,
}

impl Threads {
    /// Group `posts` into threads.
    ///
    /// Thread ids are dense and ordered by the first post (by index) that
    /// belongs to each thread. Posts with no reply links form singleton
    /// threads.
    #[must_use]
    #[instrument(skip(posts), fields(posts = posts.len()))]
    pub fn build(posts: &[Post]) -> Self {
        let n = posts.len();
        let index: HashMap<&str, usize> = posts
            .iter()
            .enumerate()
            .map(|(idx, post)| (post.id(), idx))
            .collect();

        let mut sets = UnionFind::<usize>::new(n);
        let mut first_reply: HashMap<&str, usize> = HashMap::new();

        for (idx, post) in posts.iter().enumerate() {
            let Some(parent) = post.reply_to() else {
                continue;
            };
            if let Some(&parent_idx) = index.get(parent) {
                sets.union(idx, parent_idx);
            }
            match first_reply.get(parent) {
                Some(&sibling) => {
                    sets.union(idx, sibling);
                }
                None => {
                    first_reply.insert(parent, idx);
                }
            }
        }

        let labels = sets.into_labeling();
        let mut dense: HashMap<usize, usize> = HashMap::new();
        let mut thread_of = Vec::with_capacity(n);
        let mut members: Vec<Vec<usize>> = Vec::new();

        for (idx, label) in labels.into_iter().enumerate() {
            let next = members.len();
            let thread = *dense.entry(label).or_insert(next);
            if thread == members.len() {
                members.push(Vec::new());
            }
            members[thread].push(idx);
            thread_of.push(thread);
        }

        Self { thread_of, members }
    }

    /// Number of threads, singletons included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Thread id of a post, or `None` for an out-of-range index.
    #[must_use]
    pub fn thread_of(&self, post: usize) -> Option<usize> {
        self.thread_of.get(post).copied()
    }

    /// Posts in one thread, ascending by index.
    #[must_use]
    pub fn members(&self, thread: usize) -> &[usize] {
        self.members.get(thread).map_or(&[], Vec::as_slice)
    }

    /// Threads with at least two posts.
    pub fn conversations(&self) -> impl Iterator<Item = (usize, &[usize])> {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, m)| m.len() > 1)
            .map(|(id, m)| (id, m.as_slice()))
    }

    /// `true` when both posts belong to the same thread.
    #[must_use]
    pub fn same_thread(&self, a: usize, b: usize) -> bool {
        matches!(
            (self.thread_of(a), self.thread_of(b)),
            (Some(ta), Some(tb)) if ta == tb
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: &str, parent: Option<&str>) -> Post {
        let p = Post::original(id, "u", id);
        match parent {
            Some(parent) => p.with_reply_to(parent),
            None => p,
        }
    }

    #[test]
    fn empty_corpus_has_no_threads() {
        let threads = Threads::build(&[]);
        assert!(threads.is_empty());
        assert_eq!(threads.conversations().count(), 0);
    }

    #[test]
    fn unrelated_posts_are_singletons() {
        let threads = Threads::build(&[post("a", None), post("b", None)]);
        assert_eq!(threads.len(), 2);
        assert!(!threads.same_thread(0, 1));
        assert_eq!(threads.conversations().count(), 0);
    }

    #[test]
    fn reply_chain_forms_one_thread() {
        let posts = [
            post("a", None),
            post("b", Some("a")),
            post("c", Some("b")),
            post("d", None),
        ];
        let threads = Threads::build(&posts);
        assert_eq!(threads.len(), 2);
        assert!(threads.same_thread(0, 2));
        assert!(!threads.same_thread(0, 3));
        assert_eq!(threads.members(0), &[0, 1, 2]);
        assert_eq!(threads.thread_of(3), Some(1));
    }

    #[test]
    fn siblings_of_missing_parent_share_a_thread() {
        let posts = [post("x", Some("gone")), post("y", Some("gone")), post("z", None)];
        let threads = Threads::build(&posts);
        assert!(threads.same_thread(0, 1));
        assert!(!threads.same_thread(0, 2));
    }

    #[test]
    fn reply_before_parent_in_input_order() {
        let posts = [post("child", Some("root")), post("root", None)];
        let threads = Threads::build(&posts);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads.members(0), &[0, 1]);
    }

    #[test]
    fn out_of_range_lookups_are_none() {
        let threads = Threads::build(&[post("a", None)]);
        assert_eq!(threads.thread_of(5), None);
        assert!(threads.members(9).is_empty());
        assert!(!threads.same_thread(0, 5));
    }
}
