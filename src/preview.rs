use crate::{
    serializer::{Plan, PlannedEntry},
    utils::{base_name, join_emitted},
};
use colored::Colorize;
use std::collections::HashMap;

/// Renders the emitted tree with ASCII connectors: directories in blue, files in green
/// with their stored size.
pub(crate) fn render_tree(plan: &Plan) -> String {
    let entries: HashMap<&str, &PlannedEntry> = plan
        .entries
        .iter()
        .map(|entry| (entry.path.as_str(), entry))
        .collect();
    let listings: HashMap<&str, &[String]> = plan
        .dirs
        .iter()
        .map(|dir| (dir.path.as_str(), dir.children.as_slice()))
        .collect();

    let tops = plan.tops();

    let mut out = String::new();
    let len = tops.len();
    for (i, top) in tops.into_iter().enumerate() {
        print_node(&mut out, top, &entries, &listings, "", i == len - 1);
    }

    out
}

fn print_node(
    out: &mut String,
    entry: &PlannedEntry,
    entries: &HashMap<&str, &PlannedEntry>,
    listings: &HashMap<&str, &[String]>,
    prefix: &str,
    is_last: bool,
) {
    let connector = if is_last {
        "└── ".yellow()
    } else {
        "├── ".yellow()
    };

    let label = match &entry.data {
        Some(data) => format!("{} ({} bytes)", base_name(&entry.path).green(), data.len()),
        None if entry.path == embedfs::ROOT => entry.path.blue().to_string(),
        None => base_name(&entry.path).blue().to_string(),
    };
    out.push_str(&format!("{}{}{}\n", prefix.yellow(), connector, label));

    let child_prefix = if is_last {
        format!("{}    ", prefix)
    } else {
        format!("{}│   ", prefix)
    };

    let children = listings.get(entry.path.as_str()).copied().unwrap_or_default();
    let len = children.len();
    for (i, name) in children.iter().enumerate() {
        let path = join_emitted(&entry.path, name);

        if let Some(child) = entries.get(path.as_str()) {
            print_node(out, child, entries, listings, &child_prefix, i == len - 1);
        }
    }
}

/// Prints the tree produced by [`render_tree`] between a legend and a footer.
pub(crate) fn preview_as_tree(plan: &Plan) {
    println!(
        "Legend: {} = (directory), {} = (file)",
        "blue".blue(),
        "green".green()
    );

    let fancy_prompt = format!(
        "{} {}\n",
        "┌─".bold().bright_blue(),
        "Preview".bold().bright_blue(),
    );

    println!("{}", fancy_prompt);

    print!("{}", render_tree(plan));

    let footer = format!(
        "\n{} {} entries, compressed={}",
        "└─".bold().bright_blue(),
        plan.entries.len(),
        plan.compressed
    );

    println!("{}", footer);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializer::PlannedDir;

    fn entry(path: &str, data: Option<&[u8]>) -> PlannedEntry {
        PlannedEntry {
            path: path.to_string(),
            source: path.to_string(),
            mode: 0,
            mtime: (0, 0),
            data: data.map(<[u8]>::to_vec),
        }
    }

    #[test]
    fn renders_nested_listing() {
        colored::control::set_override(false);

        let plan = Plan {
            compressed: false,
            dirs: vec![
                PlannedDir {
                    path: "/".to_string(),
                    children: vec!["b.txt".to_string(), "c".to_string()],
                },
                PlannedDir {
                    path: "/c".to_string(),
                    children: vec!["d.css".to_string()],
                },
            ],
            entries: vec![
                entry("/", None),
                entry("/b.txt", Some(b"hi")),
                entry("/c", None),
                entry("/c/d.css", Some(b"body{}")),
            ],
        };

        assert_eq!(
            render_tree(&plan),
            "└── /\n    ├── b.txt (2 bytes)\n    └── c\n        └── d.css (6 bytes)\n"
        );
    }
}
