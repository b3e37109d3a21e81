//! Textual dump of a data set, one line per element:
//!
//! ```text
//! (0002,0010) UI TransferSyntaxUID [1.2.840.10008.1.2.1]
//! (0008,1140) SQ ReferencedImageSequence [1 items]
//!   #0
//!     (0008,1150) UI ReferencedSOPClassUID [1.2.840.10008.5.1.4.1.1.4]
//! ```
use crate::mem::DataSet;
use dicomkit_core::header::Header;
use dicomkit_core::{DataDictionary, Element, Value};
use std::fmt;

const INDENT: usize = 2;

fn dump_elements<D>(
    f: &mut fmt::Formatter,
    dict: &D,
    elements: &[Element],
    depth: usize,
) -> fmt::Result
where
    D: DataDictionary,
{
    for element in elements {
        let name = dict.name_for_tag(element.tag()).unwrap_or("?");
        write!(
            f,
            "{:indent$}{} {} {}",
            "",
            element.tag(),
            element.vr(),
            name,
            indent = depth * INDENT
        )?;
        match element.value() {
            Value::Sequence(items) => {
                writeln!(f, " [{} items]", items.len())?;
                for (i, item) in items.iter().enumerate() {
                    writeln!(f, "{:indent$}#{}", "", i, indent = (depth + 1) * INDENT)?;
                    dump_elements(f, dict, item.elements(), depth + 2)?;
                }
            }
            value => writeln!(f, " [{}]", value)?,
        }
    }
    Ok(())
}

impl<D> fmt::Display for DataSet<D>
where
    D: DataDictionary,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        dump_elements(f, self.dictionary(), self.elements(), 0)
    }
}
