//! Application-wide constants.
//!
//! This module defines constants used throughout the application,
//! including the application name and the upstream cadastre endpoints.

/// The display name of the application (human-readable, with proper capitalization).
pub const APP_NAME: &str = "ParcelView";

/// The binary name of the application (used in command examples).
pub const APP_BINARY_NAME: &str = "parcelview";

/// NSW Cadastre lot layer (ID 9). Returns GeoJSON when `f=geoJSON` is supplied.
pub const NSW_PARCEL_URL: &str =
    "https://maps.six.nsw.gov.au/arcgis/rest/services/public/NSW_Cadastre/MapServer/9/query";

/// QLD Land Parcel Property Framework layer (ID 4).
pub const QLD_PARCEL_URL: &str = "https://spatial-gis.information.qld.gov.au/arcgis/rest/services/PlanningCadastre/LandParcelPropertyFramework/MapServer/4/query";

/// Upstream request timeout used when the config does not set one.
pub const DEFAULT_LOOKUP_TIMEOUT_SECS: u64 = 10;

/// Folder label used for KML documents when the request leaves it blank.
pub const DEFAULT_FOLDER_NAME: &str = "Parcels";

/// Base name used for shapefile components when the request leaves it blank.
pub const DEFAULT_SHAPEFILE_BASE: &str = "parcels";

/// File name used for KML downloads when the request leaves it blank.
pub const DEFAULT_KML_FILE_NAME: &str = "parcels.kml";

/// WGS 84 projection written to the `.prj` component.
pub const WGS84_PRJ: &str = "GEOGCS[\"WGS 84\",DATUM[\"WGS_1984\",SPHEROID[\"WGS 84\",6378137,298.257223563]],PRIMEM[\"Greenwich\",0],UNIT[\"degree\",0.0174532925199433]]";
