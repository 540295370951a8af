//! Loop construct: keep advancing while the breakpoint stays inside an
//! element.

use super::Navigator;
use crate::error::Result;
use crate::tree::Element;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
    /// Not evaluated in this pass yet
    #[default]
    Unset,
    /// The breakpoint was inside the element when the pass started
    SamePass,
    /// It was not: run the body once
    Done,
}

/// Drives a [`Navigator`] through a run of repeated records.
///
/// ```no_run
/// # fn main() -> xmlstride::Result<()> {
/// use xmlstride::{Navigator, Stride};
///
/// let mut nav = Navigator::open("feed.xml")?;
/// let root = nav.root()?;
/// let mut entries = Stride::new(root.child("entry"));
/// while entries.step(&mut nav)? {
///     println!("{:?}", entries.element().attr("id"));
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Stride {
    element: Element,
    phase: Phase,
}

impl Stride {
    pub fn new(element: Element) -> Self {
        Stride {
            element,
            phase: Phase::Unset,
        }
    }

    /// The element this loop runs over. Records reuse the same element, so
    /// this is also the current record.
    pub fn element(&self) -> &Element {
        &self.element
    }

    /// Whether the loop body should run (again).
    ///
    /// The first call of a pass always says yes. After that the navigator
    /// is advanced for as long as the breakpoint stays within the element.
    /// When a pass ends because the element's record was superseded, its
    /// children are released.
    pub fn step(&mut self, navigator: &mut Navigator) -> Result<bool> {
        if navigator.finished() || !self.element.exists() {
            self.phase = Phase::Unset;
            return Ok(false);
        }

        match self.phase {
            Phase::Unset => {
                self.phase = if navigator.breakpoint().is_within(&self.element) {
                    Phase::SamePass
                } else {
                    Phase::Done
                };
                Ok(true)
            }
            Phase::SamePass => {
                if navigator.breakpoint().is_within(&self.element) {
                    navigator.next()?;
                    return Ok(true);
                }
                self.phase = Phase::Unset;
                if navigator.previous_breakpoint().is_within(&self.element) {
                    self.element.clear_children();
                }
                Ok(false)
            }
            Phase::Done => {
                self.phase = Phase::Unset;
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn navigator(xml: &str) -> Navigator {
        Navigator::new(Cursor::new(xml.as_bytes().to_vec())).unwrap()
    }

    #[test]
    fn test_empty_element_never_loops() {
        let mut nav = navigator("<r><i/><i/></r>");
        nav.root().unwrap();
        let mut stride = Stride::new(Element::EMPTY);
        assert!(!stride.step(&mut nav).unwrap());
    }

    #[test]
    fn test_element_off_the_breakpoint_runs_once() {
        let mut nav = navigator("<r><h>head</h><i>1</i><i>2</i></r>");
        let root = nav.root().unwrap();

        let mut header = Stride::new(root.child("h"));
        let mut runs = 0;
        while header.step(&mut nav).unwrap() {
            runs += 1;
            assert_eq!(header.element().text_joined(""), Some("head".to_string()));
        }
        assert_eq!(runs, 1);
        assert!(!nav.finished());

        let mut items = Stride::new(root.child("i"));
        let mut seen = Vec::new();
        while items.step(&mut nav).unwrap() {
            seen.extend(items.element().text_joined(""));
        }
        assert_eq!(seen, vec!["1", "2"]);
    }

    #[test]
    fn test_superseded_record_releases_children() {
        let mut nav = navigator(
            "<r><g><i><v>1</v></i><i><v>2</v></i></g><g><i><v>3</v></i><i><v>4</v></i></g></r>",
        );
        let root = nav.root().unwrap();
        let item = root.select("g/i");
        assert_eq!(nav.breakpoint(), item);

        let mut items = Stride::new(item.clone());
        let mut seen = Vec::new();
        while items.step(&mut nav).unwrap() {
            seen.extend(item.child("v").text_joined(""));
        }
        assert_eq!(seen, vec!["1", "2"]);
        assert_eq!(nav.previous_breakpoint(), item);
        assert!(item.children().is_empty());
    }

    #[test]
    fn test_finished_navigator_stops_loop() {
        let mut nav = navigator("<r><i>1</i></r>");
        let root = nav.root().unwrap();
        assert!(nav.finished());
        let mut stride = Stride::new(root.child("i"));
        assert!(!stride.step(&mut nav).unwrap());
    }
}
