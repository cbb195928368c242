use super::FileMatcher;
use crate::github::ChangedFile;

/// Tallies of a changeset against a [`FileMatcher`].
///
/// Inclusion and exclusion are counted independently: a file matching both
/// sets counts toward both tallies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileCategories {
    pub matched_inclusion: usize,
    pub matched_exclusion: usize,
    pub total: usize,
}

impl FileCategories {
    pub fn count(changed_files: &[ChangedFile], matcher: &FileMatcher) -> Self {
        let mut categories = Self::default();
        for file in changed_files {
            categories.total += 1;
            if matcher.matches_inclusion(&file.name) {
                categories.matched_inclusion += 1;
            }
            if matcher.matches_exclusion(&file.name) {
                categories.matched_exclusion += 1;
            }
        }
        categories
    }

    pub fn tests_exist(&self) -> bool {
        self.matched_inclusion > 0
    }

    /// Non-empty changeset made only of excluded files and no tests.
    pub fn only_skipped_files(&self) -> bool {
        self.total > 0 && self.matched_inclusion == 0 && self.matched_exclusion == self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::PatternSource;

    fn changed(names: &[&str]) -> Vec<ChangedFile> {
        names
            .iter()
            .map(|name| ChangedFile {
                name: name.to_string(),
                status: "added".to_string(),
            })
            .collect()
    }

    fn count_default(names: &[&str]) -> FileCategories {
        FileCategories::count(&changed(names), &FileMatcher::defaults())
    }

    fn matcher(inclusion: Option<&str>, exclusion: Option<&str>, combine: bool) -> FileMatcher {
        let inclusion = inclusion.map(|s| PatternSource::Regexp(s.to_string()));
        let exclusion = exclusion.map(|s| PatternSource::Regexp(s.to_string()));
        FileMatcher::from_sources(inclusion.as_ref(), exclusion.as_ref(), combine).unwrap()
    }

    #[test]
    fn java_changeset_with_test_case() {
        let c = count_default(&[
            "path/to/Anything.java",
            "path/to/page.html",
            "path/to/test/AnythingTestCase.java",
        ]);
        assert!(c.tests_exist());
        assert_eq!(c.total, 3);
    }

    #[test]
    fn go_and_java_tests() {
        assert!(count_default(&["path/to/JavaTest.java", "path/to/golang/main_test.go"]).tests_exist());
    }

    #[test]
    fn look_alike_paths_are_not_tests() {
        let c = count_default(&[
            "path/to/Anything.java",
            "path/_test.go/page.html",
            "path/Test.java/js/something.in.js",
            "path/to/go/another_in.go",
        ]);
        assert!(!c.tests_exist());
        assert!(!c.only_skipped_files());
    }

    #[test]
    fn empty_changeset() {
        let c = count_default(&[]);
        assert_eq!(c, FileCategories::default());
        assert!(!c.tests_exist());
        assert!(!c.only_skipped_files());
    }

    #[test]
    fn docs_build_and_ci_files_are_skipped() {
        let c = count_default(&["path/to/README.adoc", "pom.xml", ".travis.yml"]);
        assert!(c.only_skipped_files());
        assert!(!c.tests_exist());
    }

    #[test]
    fn vendored_test_counts_in_both_tallies() {
        let c = count_default(&["vendor/github.com/test/repo/should_ignore_this_test.go"]);
        assert_eq!(c.matched_inclusion, 1);
        assert_eq!(c.matched_exclusion, 1);
        assert!(!c.only_skipped_files());
    }

    #[test]
    fn configured_inclusion() {
        let m = matcher(Some(r"_test\.rb$"), None, false);
        let c = FileCategories::count(
            &changed(&["path/to/github_service.rb", "path/to/github_service_test.rb"]),
            &m,
        );
        assert!(c.tests_exist());
        assert_eq!(c.matched_inclusion, 1);
    }

    #[test]
    fn configured_exclusion_with_default_inclusion() {
        let m = matcher(None, Some(r"(\.txt|\.svg|\.png)$"), false);
        let c = FileCategories::count(
            &changed(&[
                "src/test/java/org/my/CoolTestCase.java",
                "path/to/README.txt",
                "meme.svg",
                "test.png",
            ]),
            &m,
        );
        assert!(c.tests_exist());
        assert!(!c.only_skipped_files());
    }

    #[test]
    fn configured_exclusion_only() {
        let m = matcher(None, Some(r"(\.txt|\.svg|\.png)$"), false);
        let c = FileCategories::count(
            &changed(&["path/to/README.txt", "meme.svg", "test.png"]),
            &m,
        );
        assert!(c.only_skipped_files());
    }

    #[test]
    fn configured_exclusion_replaces_defaults() {
        let m = matcher(None, Some(r"\.svg$"), false);
        let c = FileCategories::count(&changed(&["test.svg", ".travis.yml"]), &m);
        assert_eq!(c.matched_exclusion, 1);
        assert!(!c.only_skipped_files());
    }

    #[test]
    fn combined_exclusion_keeps_defaults() {
        let m = matcher(None, Some(r"\.svg$"), true);
        let c = FileCategories::count(
            &changed(&["test.svg", "path/to/README.adoc", "pom.xml", ".travis.yml"]),
            &m,
        );
        assert!(c.only_skipped_files());
    }

    #[test]
    fn overlapping_inclusion_and_exclusion_count_independently() {
        let m = matcher(Some(r"test\.txt"), Some(r"(\.txt|\.svg|\.png)$"), false);
        let c = FileCategories::count(
            &changed(&["path/to/my_test.txt", "path/to/README.txt", "meme.svg", "test.png"]),
            &m,
        );
        assert_eq!(c.matched_inclusion, 1);
        assert_eq!(c.matched_exclusion, 4);
        assert!(c.tests_exist());
        assert!(!c.only_skipped_files());
    }

    #[test]
    fn combined_inclusion_keeps_defaults() {
        let m = matcher(Some("FunctionalTest.java$"), None, true);
        let c = FileCategories::count(
            &changed(&[
                "src/test/com/acme/UnitTest.java",
                "src/test/com/acme/AwesomeFunctionalTest.java",
            ]),
            &m,
        );
        assert_eq!(c.matched_inclusion, 2);
    }
}
