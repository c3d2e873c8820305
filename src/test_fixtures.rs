//! Small, hand-written QCLCD archives and zip sources for unit tests.

use crate::archive::reader::InnerFile;
use crate::geo::zip_source::ZipSource;
use crate::types::month::Month;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::ZipWriter;

pub(crate) fn write_zip(path: &Path, files: &[(&str, &str)]) {
    let mut writer = ZipWriter::new(File::create(path).unwrap());
    for (name, contents) in files {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap();
}

/// Stations around Poughkeepsie (12601) and Oakland (94611). Rows are listed
/// out of distance order on purpose; 99999 has no usable coordinates.
pub(crate) const STATIONS: &str = "\
WBAN|WMO|CallSign|ClimateDivisionCode|ClimateDivisionStateCode|ClimateDivisionStationCode|Name|State|Location|Latitude|Longitude|GroundHeight|StationHeight|Barometer|TimeZone
94789|74486|JFK|04|30|0|NEW YORK|NY|JFK INTL AIRPORT|40.639|-73.762|11|||-5
14757|72503|POU|05|30|0|POUGHKEEPSIE|NY|DUTCHESS CO AIRPORT|41.627|-73.884|154|||-5
04789|||05|30|0|MONTGOMERY|NY|ORANGE CO AIRPORT|41.509|-74.265|364|||-5
99999|||||0|NOWHERE|NY|UNKNOWN|||0|||-5
23230|72493|OAK|04|04|0|OAKLAND|CA|METRO INTL AIRPORT|37.721|-122.221|6|||-8
";

/// Daily rows. 14757 misses Tavg on the 2nd and has nothing for the 3rd;
/// 04789 fills both. 94789 reports on the 3rd only.
pub(crate) const DAILY: &str = "\
WBAN,YearMonthDay,Tmax,TmaxFlag,Tmin,TminFlag,Tavg,TavgFlag,PrecipTotal,PrecipTotalFlag
14757,20130301,45,,30,,38,,0.00,
14757,20130302,47,,31,,M,,T,
04789,20130301,44,,29,,36,,0.01,
04789,20130302,46,,30,,37,,0.00,
04789,20130303,48,,32,,40,,0.10,
94789,20130303,50,,35,,42,,0.20,
23230,20130301,61,,48,,55,,0.00,
";

/// Hourly rows. 14757 lacks a temperature in the 01:00 hour, 04789 has one.
pub(crate) const HOURLY: &str = "\
WBAN,Date,Time,StationType,DryBulbFarenheit,DryBulbFarenheitFlag,RelativeHumidity,RelativeHumidityFlag
14757,20130301,0053,12,30,,80,
14757,20130301,0153,12,M,,82,
14757,20130301,0253,12,32,,81,
04789,20130301,0056,12,28,,85,
04789,20130301,0156,12,29,,86,
04789,20130301,0230,12,,,88,
23230,20130301,0053,12,52,,70,
";

/// Writes `QCLCDyyyymm.zip` with the fixture station, daily and hourly files.
pub(crate) fn write_month_archive(dir: &Path, month: Month) -> PathBuf {
    let path = dir.join(format!("QCLCD{}.zip", month.prefix()));
    let station = InnerFile::Station.name(month);
    let daily = InnerFile::Daily.name(month);
    let hourly = InnerFile::Hourly.name(month);
    write_zip(
        &path,
        &[
            (station.as_str(), STATIONS),
            (daily.as_str(), DAILY),
            (hourly.as_str(), HOURLY),
        ],
    );
    path
}

/// Writes the three standard zip sources into `dir`, overlapping on purpose.
pub(crate) fn write_zip_sources(dir: &Path) -> Vec<ZipSource> {
    let sources = ZipSource::defaults_in(dir);

    std::fs::write(
        &sources[0].path,
        "\"zip\",\"city\",\"state\",\"latitude\",\"longitude\",\"timezone\",\"dst\"\n\
         \"12601\",\"Poughkeepsie\",\"NY\",\"41.7004\",\"-73.921\",\"-5\",\"1\"\n\
         \"94611\",\"Oakland\",\"CA\",\"37.8216\",\"-122.2137\",\"-8\",\"1\"\n",
    )
    .unwrap();

    write_zip(
        &sources[1].path,
        &[(
            sources[1].inner_file.as_deref().unwrap(),
            "GEOID\tALAND\tAWATER\tALAND_SQMI\tAWATER_SQMI\tINTPTLAT\tINTPTLONG\n\
             12601\t1\t1\t1\t1\t10.0\t10.0\n\
             94301\t1\t1\t1\t1\t37.444324\t-122.149685\n",
        )],
    );

    write_zip(
        &sources[2].path,
        &[(
            sources[2].inner_file.as_deref().unwrap(),
            "\"Zipcode\",\"ZipCodeType\",\"City\",\"State\",\"LocationType\",\"Lat\",\"Long\"\n\
             \"94301\",\"STANDARD\",\"PALO ALTO\",\"CA\",\"PRIMARY\",\"20.0\",\"20.0\"\n\
             \"10001\",\"STANDARD\",\"NEW YORK\",\"NY\",\"PRIMARY\",\"40.75\",\"-73.99\"\n\
             \"09001\",\"MILITARY\",\"APO\",\"AE\",\"PRIMARY\",\"\",\"\"\n",
        )],
    );

    sources
}
