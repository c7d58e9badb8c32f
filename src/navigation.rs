//! UI route construction

use std::fmt::Display;

/// Routes to the admin pages of contexts and sets
pub trait NavigationPaths: Send + Sync {
    fn context_info(&self, context: &str) -> String;

    fn set_list(&self, context: &str, set: &str) -> String;

    fn create(&self, context: &str, set: &str) -> String;

    fn edit(&self, context: &str, set: &str, id: &dyn Display) -> String;

    fn delete(&self, context: &str, set: &str, id: &dyn Display) -> String;
}

/// Routes under `/DbContext`
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNavigationPaths;

impl NavigationPaths for DefaultNavigationPaths {
    fn context_info(&self, context: &str) -> String {
        format!("/DbContext/{}/Info", context)
    }

    fn set_list(&self, context: &str, set: &str) -> String {
        format!("/DbContext/{}/DbSet/{}", context, set)
    }

    fn create(&self, context: &str, set: &str) -> String {
        format!("{}/Create", self.set_list(context, set))
    }

    fn edit(&self, context: &str, set: &str, id: &dyn Display) -> String {
        format!("{}/Edit/{}", self.set_list(context, set), id)
    }

    fn delete(&self, context: &str, set: &str, id: &dyn Display) -> String {
        format!("{}/Delete/{}", self.set_list(context, set), id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let paths = DefaultNavigationPaths;
        assert_eq!(paths.context_info("DemoDbContext"), "/DbContext/DemoDbContext/Info");
        assert_eq!(
            paths.set_list("DemoDbContext", "Parents"),
            "/DbContext/DemoDbContext/DbSet/Parents"
        );
        assert_eq!(
            paths.create("DemoDbContext", "Parents"),
            "/DbContext/DemoDbContext/DbSet/Parents/Create"
        );
        assert_eq!(
            paths.edit("DemoDbContext", "Parents", &42),
            "/DbContext/DemoDbContext/DbSet/Parents/Edit/42"
        );
        assert_eq!(
            paths.delete("DemoDbContext", "Jobs", &"a1"),
            "/DbContext/DemoDbContext/DbSet/Jobs/Delete/a1"
        );
    }
}
