//! A minimal version of `calyx_opt`'s `Named` trait: enough to give every
//! compiler pass a stable name and description for log tags, without the
//! surrounding `Visitor`/`Action` tree-traversal machinery Calyx needs for
//! its control ASTs (this language has no control tree to walk).
pub trait Named {
    /// The name of a pass, used to tag its log output.
    fn name() -> &'static str;
    /// A short, human-readable description of what the pass does.
    fn description() -> &'static str;
}
