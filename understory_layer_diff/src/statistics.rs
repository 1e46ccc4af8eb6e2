// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

/// Counters for how picture content was compared during one diff pass.
///
/// Pictures are the leaves whose comparison dominates diff cost, so the
/// outcome of each comparison is counted here.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DiffStatistics {
    /// Pictures with no previous counterpart.
    pub new_pictures: usize,
    /// Pictures too large to compare op by op; treated as changed.
    pub pictures_too_complex_to_compare: usize,
    /// Pictures compared op by op.
    pub deep_compare_pictures: usize,
    /// Deep-compared pictures that turned out equal.
    pub different_instance_but_equal_pictures: usize,
    /// Pictures that were the very same instance as the previous frame's.
    pub same_instance_pictures: usize,
}

impl DiffStatistics {
    /// Counts a picture with no previous counterpart.
    pub fn add_new_picture(&mut self) {
        self.new_pictures += 1;
    }

    /// Counts a picture skipped for being too complex to compare.
    pub fn add_picture_too_complex_to_compare(&mut self) {
        self.pictures_too_complex_to_compare += 1;
    }

    /// Counts a deep comparison.
    pub fn add_deep_compare_picture(&mut self) {
        self.deep_compare_pictures += 1;
    }

    /// Counts a deep comparison that found the pictures equal.
    pub fn add_different_instance_but_equal_picture(&mut self) {
        self.different_instance_but_equal_pictures += 1;
    }

    /// Counts a picture shared with the previous frame.
    pub fn add_same_instance_picture(&mut self) {
        self.same_instance_pictures += 1;
    }

    /// Total pictures visited.
    #[must_use]
    pub fn total_pictures(&self) -> usize {
        self.new_pictures
            + self.pictures_too_complex_to_compare
            + self.deep_compare_pictures
            + self.same_instance_pictures
    }
}
