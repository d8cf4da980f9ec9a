// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-name to directory-path conversion.

/// Copy `name`, substituting every `sep` with `/`, bounded by `max` output
/// characters.
pub fn name_to_dir(sep: char, name: &str, max: usize) -> String {
    name.chars()
        .take(max)
        .map(|c| if c == sep { '/' } else { c })
        .collect()
}

#[cfg(test)]
#[path = "name_fmt_tests.rs"]
mod tests;
