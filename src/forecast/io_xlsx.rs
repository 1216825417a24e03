use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::forecast::*;

/// Reads the votes of each bloc from an Excel workbook.
///
/// The first row holds the names of the candidates, after a first column that
/// holds the names of the blocs. Empty cells are zero votes.
pub fn read_bloc_workbook(path: String, cfs: &FileSource) -> FcResult<Vec<CandidateBlocs>> {
    let wrange = get_range(&path, cfs)?;

    let header = wrange.rows().next().context(EmptyExcelSnafu {})?;
    debug!("read_bloc_workbook: header: {:?}", header);
    let mut res: Vec<CandidateBlocs> = Vec::new();
    for cell in header.iter().skip(1) {
        match cell {
            DataType::String(s) if !s.trim().is_empty() => res.push(CandidateBlocs {
                name: s.trim().to_string(),
                party: None,
                blocs: Vec::new(),
            }),
            DataType::Empty => {}
            _ => {
                return ExcelWrongCellTypeSnafu {
                    lineno: 1_u64,
                    content: format!("{:?}", cell),
                }
                .fail();
            }
        }
    }
    if res.is_empty() {
        whatever!("No candidate found in the first row of {}", path);
    }

    let mut iter = wrange.rows();
    iter.next();
    for (idx, row) in iter.enumerate() {
        let lineno = (idx + 2) as u64;
        debug!("read_bloc_workbook: {:?} row: {:?}", lineno, row);
        let bloc = match row.first() {
            Some(DataType::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(DataType::Float(f)) => f.to_string(),
            Some(DataType::Int(i)) => i.to_string(),
            // Blank lines at the end of the sheet.
            Some(DataType::Empty) | None => continue,
            Some(c) => {
                return ExcelWrongCellTypeSnafu {
                    lineno,
                    content: format!("{:?}", c),
                }
                .fail();
            }
        };
        for (cidx, cand) in res.iter_mut().enumerate() {
            let votes = read_votes(row.get(cidx + 1), lineno)?;
            cand.blocs.push(BlocVotes {
                bloc: bloc.clone(),
                votes,
            });
        }
    }
    info!(
        "read_bloc_workbook: {} candidates from {}",
        res.len(),
        path
    );
    Ok(res)
}

fn read_votes(cell: Option<&DataType>, lineno: u64) -> FcResult<u64> {
    match cell {
        None | Some(DataType::Empty) => Ok(0),
        Some(DataType::Int(i)) if *i >= 0 => Ok(*i as u64),
        Some(DataType::Float(f)) if *f >= 0.0 => Ok(f.round() as u64),
        Some(DataType::String(s)) => match s.trim().parse::<u64>() {
            Ok(v) => Ok(v),
            Err(_) if s.trim().is_empty() => Ok(0),
            Err(_) => ExcelWrongCellTypeSnafu {
                lineno,
                content: s.clone(),
            }
            .fail(),
        },
        Some(c) => ExcelWrongCellTypeSnafu {
            lineno,
            content: format!("{:?}", c),
        }
        .fail(),
    }
}

fn get_range(path: &String, cfs: &FileSource) -> FcResult<calamine::Range<DataType>> {
    let worksheet_name_o = cfs.excel_worksheet_name.clone();
    debug!(
        "read_bloc_workbook: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let p = path.clone();
    let mut workbook: Xlsx<_> =
        open_workbook(p).context(OpeningExcelSnafu { path: path.clone() })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path: path.clone() })?;

        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => EmptyExcelSnafu {}.fail(),
            [(worksheet_name, wrange)] => {
                debug!(
                    "read_bloc_workbook: path: {:?} worksheet: {:?}",
                    &path, &worksheet_name
                );
                Ok(wrange.clone())
            }
            _ => {
                whatever!("Too many worksheets in {}, the worksheet name must be provided", path)
            }
        }
    }
}
