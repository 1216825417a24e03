/*!

This is the long-form manual for `forecast_engine` and `elforecast`.

## Commands

`elforecast` reads a configuration file in JSON and writes a summary in JSON.
All the commands accept the following options:
* `--out <path>`: where to write the summary (`stdout` by default)
* `--reference <path>`: a summary to compare with. The differences are printed
  and the command fails if the summaries differ.
* `--verbose`: turns on the debug logs. The `RUST_LOG` variable still applies.

### `project`

Projects a constituency from the votes entered for each bloc of voters. The
votes of each candidate are scaled so that all the candidates add up to the
number of voters implied by the turnout. The winner is `Tie` if several
candidates share the first place, or if nobody has any vote.

Candidates may also be given with a `predictedVoteShare` instead of blocs. The
shares are then applied directly to the number of voters.

### `redistribute`

Applies new vote shares to some regions of a forecast run. The regions that
are not adjusted keep their votes. The summary contains the national result,
the changes in each adjusted region and the request to save the scenario as a
new run. The registered voters of a county are implied by its votes and its
turnout; the counties without a turnout are not saved and are listed under
`countiesNotSaved`.

### `validate`

Checks the adjustments of a scenario without running it. The summary is the
validation report. A region adjusted twice is a warning: only the last
adjustment is kept.

### `merge`

Builds the county map of a forecast run. The run is taken from a run catalog:
by default the newest official run, then the newest published run, then the
newest run. With `"preferOfficial": false` the official runs get no
priority. County codes are compared without leading zeros: `"01"` and `1` are
the same county. With `fallbackEnabled`, the counties missing from the run are taken
from the newest official run.

## Input formats

The following formats are supported for forecast rows:
* `json` the export of the forecasting service
* `csv` Comma Separated Values

and the following for blocs:
* `xlsx` Excel workbook

### `json`

A list of rows, one per candidate and county:

```text
[
  {
    "candidate": {"name": "A", "party": "UDA"},
    "county": {"code": "22", "name": "Kiambu"},
    "predicted_vote_share": "70.5",
    "predicted_turnout": 68.2,
    "predicted_votes": 700
  }
]
```

Numbers may be written as JSON numbers or as strings.

### `csv`

The first row is a header with the columns:

```text
county_code,county_name,candidate,party,predicted_vote_share,predicted_turnout,predicted_votes
22,Kiambu,A,UDA,70.5,68.2,700
```

Empty cells are missing values.

### `xlsx`

One row per bloc. The first row lists the candidates after a column for the
names of the blocs:

|          | candidate A | candidate B | ... |
|----------|-------------|-------------|-----|
| bloc 1   | 50000       | 15000       |     |
| bloc 2   | 40000       | 10000       |     |

Empty cells count as zero votes. The worksheet is chosen with
`excelWorksheetName`; without it, the workbook must have a single worksheet.

## Configuration

The configuration file uses camelCase keys:

```text
{
  "outputSettings": {
    "scenarioName": "Mount Kenya swing",
    "description": "optional",
    "electionYear": 2027,
    "electionType": "presidential"
  },
  "rules": {"shareTolerance": "0.1", "maxNameLength": 100, "confidenceHalfWidth": 3},
  "projection": {
    "registeredVoters": 100000,
    "turnoutPercent": "60",
    "countyCode": "45",
    "candidates": [{"name": "A", "party": "UDA", "blocs": [{"bloc": "north", "votes": 50000}]}],
    "blocSource": {"provider": "xlsx", "filePath": "blocs.xlsx"}
  },
  "forecastSources": [{"provider": "csv", "filePath": "rows.csv"}],
  "adjustments": [
    {"region": "Mount Kenya", "shares": [{"candidate": "A", "share": 45}, {"candidate": "B", "share": "55"}]}
  ],
  "runCatalog": {"filePath": "runs.json", "preferOfficial": true},
  "runSources": [{"runId": "run-1", "source": {"provider": "json", "filePath": "run1.json"}}],
  "fallbackEnabled": true
}
```

Only the sections used by the command are required. The paths are relative to
the directory of the configuration file. Without `rules`, the default rules
apply: the shares of a region must add up to 100 within 0.1, the name of a
scenario has at most 100 characters and the confidence band is 3 points on
each side of a projected share.

The run catalog is a list of runs:

```text
[
  {
    "id": "run-1",
    "run_timestamp": "2026-03-01T08:00:00Z",
    "is_official": true,
    "visibility": "published",
    "election": {"year": 2027, "election_type": "presidential"}
  }
]
```

 */
