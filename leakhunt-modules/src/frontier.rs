//! Crawl frontier
//!
//! Holds the targets still to fetch and the URLs already dequeued. A URL is
//! marked visited at the moment it leaves the queue, so a link found on two
//! pages is fetched at most once.

use std::collections::{HashSet, VecDeque};
use std::hash::{Hash, Hasher};

use leakhunt_core::normalize_url;

/// A URL to fetch and its distance from the seed
#[derive(Debug, Clone)]
pub struct CrawlTarget {
    url: String,
    normalized: String,
    depth: u32,
}

impl CrawlTarget {
    /// `None` unless `url` is an absolute http(s) URL
    pub fn new(url: &str, depth: u32) -> Option<Self> {
        let normalized = normalize_url(url)?;
        Some(Self {
            url: url.trim().to_string(),
            normalized,
            depth,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }
}

impl PartialEq for CrawlTarget {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for CrawlTarget {}

impl Hash for CrawlTarget {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

/// Queue of pending targets with visited tracking and a page budget
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<CrawlTarget>,
    queued: HashSet<String>,
    visited: HashSet<String>,
    max_pages: usize,
    dequeued: usize,
}

impl Frontier {
    pub fn new(max_pages: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            max_pages,
            dequeued: 0,
        }
    }

    /// Queue a target, at the front when `priority` is set.
    /// Returns false if its URL was already visited or queued.
    pub fn push(&mut self, target: CrawlTarget, priority: bool) -> bool {
        if self.visited.contains(target.normalized()) || self.queued.contains(target.normalized()) {
            return false;
        }

        self.queued.insert(target.normalized().to_string());
        if priority {
            self.queue.push_front(target);
        } else {
            self.queue.push_back(target);
        }
        true
    }

    /// Dequeue the next target and mark it visited.
    /// Returns `None` when the queue is empty or the page budget is spent.
    pub fn pop(&mut self) -> Option<CrawlTarget> {
        while !self.budget_exhausted() {
            let target = self.queue.pop_front()?;
            self.queued.remove(target.normalized());

            if self.mark_visited(target.normalized()) {
                self.dequeued += 1;
                return Some(target);
            }
        }
        None
    }

    /// Mark a URL visited; false if it already was
    pub fn mark_visited(&mut self, url: &str) -> bool {
        match normalize_url(url) {
            Some(normalized) => self.visited.insert(normalized),
            None => false,
        }
    }

    pub fn is_visited(&self, url: &str) -> bool {
        normalize_url(url).is_some_and(|n| self.visited.contains(&n))
    }

    /// Whether every allowed dequeue has happened
    pub fn budget_exhausted(&self) -> bool {
        self.dequeued >= self.max_pages
    }

    /// Targets dequeued so far
    pub fn dequeued(&self) -> usize {
        self.dequeued
    }

    /// Targets still queued
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
