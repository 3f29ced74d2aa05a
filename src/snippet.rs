//! Selection of source code snippets by line numbers and labels.
//!
//! Labels are trailing line comments. With comment string `#` and label
//! `x`, a line ending in `# start x` opens a range and `# end x` closes
//! it, `# +x` keeps a single line and `# -x` drops one line from an open
//! range. Marker lines themselves are not part of the selection.

use std::collections::{BTreeSet, HashSet};
use anyhow::{anyhow, Result};

/// Parse 1-based line numbers and ranges like `3;4-5;22+12-15` into
/// 0-based indices, in the given order.
pub fn split_line_choices(text: Option<&str>) -> Result<Option<Vec<usize>>> {
    let mut indices = Vec::new();

    for part in words(text.unwrap_or("")) {
        let (start, end) = match part.find('-') {
            Some(index) => (&part[..index], &part[index + 1..]),
            None        => (part, part),
        };

        let start = number(start, part)?;
        let end   = number(end, part)?;

        indices.extend(start - 1..end);
    }

    Ok(match indices.is_empty() {
        true  => None,
        false => Some(indices),
    })
}

pub fn split_labels(text: Option<&str>) -> BTreeSet<String> {
    words(text.unwrap_or("")).map(str::to_owned).collect()
}

pub fn select_lines<S: AsRef<str>>(code: &[S], lines: Option<&[usize]>, labels: &BTreeSet<String>, comment: &str, max_empty: usize) -> Result<Vec<String>> {
    if comment.is_empty() {
        return Err(anyhow!("empty line comment marker"));
    }

    let mut keep = match labels.is_empty() {
        true  => code.iter().map(|line| line.as_ref().trim_end().to_owned()).collect(),
        false => labelled(code, labels, comment)?,
    };

    if let Some(lines) = lines {
        let indices = lines.iter().copied().collect::<BTreeSet<_>>();
        if indices.is_empty() {
            return Err(anyhow!("empty line selection"));
        }

        keep = indices.into_iter().map(|index| {
            keep.get(index).cloned().ok_or_else(|| {
                anyhow!("line {} selected but only {} available", index + 1, keep.len())
            })
        }).collect::<Result<_>>()?;
    }

    let first = keep.iter().position(|line| !line.is_empty());
    let last  = keep.iter().rposition(|line| !line.is_empty());

    let keep = match (first, last) {
        (Some(first), Some(last)) => &keep[first..=last],
        _                         => return Err(anyhow!("no code left after selection")),
    };

    let mut result = Vec::with_capacity(keep.len());
    let mut empty  = 0;

    for line in keep {
        match line.is_empty() {
            true  => empty += 1,
            false => empty = 0,
        }

        if empty <= max_empty {
            result.push(line.clone());
        }
    }

    Ok(result)
}

/// Remove the longest run of leading spaces shared by all non-blank lines.
pub fn strip_common_whitespace_prefix<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    let prefix = lines.iter().filter_map(|line| {
        let line    = line.as_ref();
        let leading = line.len() - line.trim_start_matches(' ').len();
        match leading < line.len() {
            true  => Some(leading),
            false => None,
        }
    }).min().unwrap_or(usize::MAX);

    lines.iter().map(|line| {
        let line = line.as_ref();
        match prefix {
            0 => line.to_owned(),
            n => line.get(n..).unwrap_or("").to_owned(),
        }
    }).collect()
}

fn labelled<S: AsRef<str>>(code: &[S], labels: &BTreeSet<String>, comment: &str) -> Result<Vec<String>> {
    let labels = labels.iter().map(|label| label.trim()).collect::<Vec<_>>();

    if labels.iter().any(|label| label.is_empty()) {
        return Err(anyhow!("empty label in {:?}", labels));
    }

    let markers = |form: &str| {
        labels.iter().map(|label| form.replace("{c}", comment).replace("{l}", label)).collect::<Vec<_>>()
    };

    let starts  = markers("{c} start {l}");
    let ends    = markers("{c} end {l}");
    let adds    = markers("{c} +{l}");
    let removes = markers("{c} -{l}");

    let mut active = HashSet::new();
    let mut done   = HashSet::new();
    let mut keep   = Vec::new();

    for (number, line) in code.iter().enumerate() {
        let mut line    = line.as_ref().trim_end();
        let mut current = active.clone();
        let mut found   = true;

        while found {
            found = false;

            for (i, marker) in starts.iter().enumerate() {
                if let Some(rest) = line.strip_suffix(marker.as_str()) {
                    line = rest.trim_end();
                    if !active.insert(i) {
                        return Err(anyhow!("label {} already started in line {}", labels[i], number + 1));
                    }
                    found = true;
                }
            }

            for (i, marker) in ends.iter().enumerate() {
                if let Some(rest) = line.strip_suffix(marker.as_str()) {
                    line = rest.trim_end();
                    if !active.remove(&i) {
                        return Err(anyhow!("label {} ended in line {} but never started", labels[i], number + 1));
                    }
                    current.remove(&i);
                    found = true;
                }
            }

            for (i, marker) in adds.iter().enumerate() {
                if let Some(rest) = line.strip_suffix(marker.as_str()) {
                    line = rest.trim_end();
                    if !current.insert(i) {
                        return Err(anyhow!("label {} already active in line {}", labels[i], number + 1));
                    }
                    found = true;
                }
            }

            for (i, marker) in removes.iter().enumerate() {
                if let Some(rest) = line.strip_suffix(marker.as_str()) {
                    line = rest.trim_end();
                    if !current.remove(&i) {
                        return Err(anyhow!("label {} not active in line {}", labels[i], number + 1));
                    }
                    found = true;
                    break;
                }
            }
        }

        if !current.is_empty() {
            keep.push(line.to_owned());
            done.extend(current);
        }
    }

    if keep.is_empty() {
        return Err(anyhow!("nothing selected by labels {:?}", labels));
    }

    let unused = labels.iter().enumerate().filter(|(i, _)| !done.contains(i)).map(|(_, label)| *label).collect::<Vec<_>>();
    if !unused.is_empty() {
        return Err(anyhow!("no code for labels {:?}", unused));
    }

    Ok(keep)
}

fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c| SEPARATORS.contains(c)).map(str::trim).filter(|word| !word.is_empty())
}

fn number(text: &str, part: &str) -> Result<usize> {
    match text.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _              => Err(anyhow!("invalid line selection {:?}", part)),
    }
}

const SEPARATORS: &str = ";,+\n\t ";

#[cfg(test)]
mod test {
    use std::collections::BTreeSet;
    use anyhow::Result;
    use super::*;

    #[test]
    fn line_choices() -> Result<()> {
        assert_eq!(None, split_line_choices(None)?);
        assert_eq!(None, split_line_choices(Some(""))?);
        assert_eq!(None, split_line_choices(Some(","))?);
        assert_eq!(Some(vec![0]), split_line_choices(Some("1"))?);
        assert_eq!(Some(vec![0, 1]), split_line_choices(Some("1,2"))?);
        assert_eq!(Some(vec![0, 1, 2, 3, 4]), split_line_choices(Some("1-5"))?);
        assert_eq!(Some(vec![2, 3, 4, 6, 21, 11, 12, 13, 14]), split_line_choices(Some("3;4-5;7-7;22+12-15;"))?);

        assert!(split_line_choices(Some("0")).is_err());
        assert!(split_line_choices(Some("a-3")).is_err());

        Ok(())
    }

    #[test]
    fn labels() {
        assert!(split_labels(None).is_empty());
        assert!(split_labels(Some(",")).is_empty());

        let expect = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
        assert_eq!(expect, split_labels(Some("a;b;d;c")));
        assert_eq!(expect, split_labels(Some("a,b c+a;a\td;c")));
    }

    #[test]
    fn select() -> Result<()> {
        let none = BTreeSet::new();
        let code = ["def a():", "    b=c", "    return x"];

        assert_eq!(code.to_vec(), select_lines(&code, None, &none, "#", 2)?);
        assert_eq!(vec!["def a():", "    return x"], select_lines(&code, Some(&[2, 0, 2][..]), &none, "#", 2)?);
        assert!(select_lines(&code, Some(&[3][..]), &none, "#", 2).is_err());
        assert!(select_lines(&code, Some(&[][..]), &none, "#", 2).is_err());

        let code   = ["# start x", "def a():", " b=c # -x", "    return x", "# end x"];
        let labels = split_labels(Some("x"));
        assert_eq!(vec!["def a():", "    return x"], select_lines(&code, None, &labels, "#", 2)?);
        assert_eq!(vec!["    return x"], select_lines(&code, Some(&[1][..]), &labels, "#", 2)?);

        Ok(())
    }

    #[test]
    fn markers() -> Result<()> {
        let code = [
            "import os  // +b",
            "// start b",
            "// start a",
            "x = 1",
            "y = 2  // -a",
            "// end a",
            "z = 3",
            "// end b",
        ];

        let labels = split_labels(Some("a"));
        assert_eq!(vec!["x = 1"], select_lines(&code, None, &labels, "//", 2)?);

        let labels = split_labels(Some("a b"));
        assert_eq!(vec!["import os", "", "x = 1", "y = 2", "", "z = 3"], select_lines(&code, None, &labels, "//", 2)?);
        assert_eq!(vec!["import os", "x = 1", "y = 2", "z = 3"], select_lines(&code, None, &labels, "//", 0)?);

        assert!(select_lines(&code, None, &split_labels(Some("c")), "//", 2).is_err());
        assert!(select_lines(&["# end a"], None, &split_labels(Some("a")), "#", 2).is_err());
        assert!(select_lines(&["# start a", "# start a"], None, &split_labels(Some("a")), "#", 2).is_err());
        assert!(select_lines(&["x # -a"], None, &split_labels(Some("a")), "#", 2).is_err());
        assert!(select_lines(&["# start a", "x # +a"], None, &split_labels(Some("a")), "#", 2).is_err());

        Ok(())
    }

    #[test]
    fn empty_lines() -> Result<()> {
        let none = BTreeSet::new();
        let code = ["", "a", "", "b", "", "", "c", "", "", "", "d", "e", ""];

        assert_eq!(vec!["a", "", "b", "", "", "c", "", "", "", "d", "e"], select_lines(&code, None, &none, "#", 3)?);
        assert_eq!(vec!["a", "", "b", "", "", "c", "", "", "d", "e"], select_lines(&code, None, &none, "#", 2)?);
        assert_eq!(vec!["a", "", "b", "", "c", "", "d", "e"], select_lines(&code, None, &none, "#", 1)?);
        assert_eq!(vec!["a", "b", "c", "d", "e"], select_lines(&code, None, &none, "#", 0)?);

        assert!(select_lines(&["", "  "], None, &none, "#", 2).is_err());

        Ok(())
    }

    #[test]
    fn dedent() {
        assert_eq!(vec!["a", " b"], strip_common_whitespace_prefix(&[" a", "  b"]));
        assert_eq!(vec!["a", "b"], strip_common_whitespace_prefix(&[" a", " b"]));
        assert_eq!(vec!["a", "b"], strip_common_whitespace_prefix(&["  a", "  b"]));
        assert_eq!(vec!["  a", "  b", "c"], strip_common_whitespace_prefix(&["  a", "  b", "c"]));
        assert_eq!(vec![" a", "  b", "c"], strip_common_whitespace_prefix(&[" a", "  b", "c"]));
        assert_eq!(vec!["a", "b", "  c"], strip_common_whitespace_prefix(&["  a", "  b", "    c"]));
        assert_eq!(vec!["a", "", "b"], strip_common_whitespace_prefix(&["  a", "", "  b"]));
    }
}
