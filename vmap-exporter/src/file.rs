//! Writer of the whole map container: header, zoom-level records, chunk
//! descriptions, chunk data, style records and style draw orders.

use std::fs;
use std::path::Path;

use thiserror::Error;

use vmap_core::classes::{ArealObjectClass, LinearObjectClass, PointObjectClass};
use vmap_core::data_file::{
    self, header_offsets, put_f64, put_i32, put_u16, put_u32, zoom_level_offsets,
    CHUNK_DESCRIPTION_SIZE, HEADER_SIZE, MAGIC, VERSION, ZOOM_LEVEL_RECORD_SIZE,
};
use vmap_core::ir::ObjectsData;
use vmap_core::styles::{Styles, ZoomLevelStyles};

use crate::chunk::{dump_data_chunk, MAX_CHUNK_SIZE};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot write output file: {0}")]
    Io(#[from] std::io::Error),
}

fn dump_zoom_level_styles(
    result: &mut Vec<u8>,
    zoom_level_record_start: usize,
    zoom_level_styles: &ZoomLevelStyles,
    meters_in_unit: f32,
) {
    // Style records are indexed by class discriminant, so every class gets a
    // record, styled or not.
    let point_styles_offset = result.len();
    for _object_class in &PointObjectClass::ALL {
        // Icon rasters are left to the platform; slots stay zeroed.
        put_u16(result, 0); // icon_width
        put_u16(result, 0); // icon_height
        put_u32(result, 0); // icon_data_offset
    }

    let linear_styles_offset = result.len();
    for object_class in &LinearObjectClass::ALL {
        match zoom_level_styles.linear_object_styles.get(object_class) {
            Some(style) => {
                result.extend_from_slice(&style.color);
                result.extend_from_slice(&style.color2);
                put_u32(result, (style.width_m / meters_in_unit * 256.0) as u32);
                put_u32(result, (style.dash_size_m / meters_in_unit * 256.0) as u32);
            }
            None => {
                result.extend_from_slice(&[128, 128, 128, 255]);
                result.extend_from_slice(&[128, 128, 128, 255]);
                put_u32(result, 0);
                put_u32(result, 0);
            }
        }
        put_u16(result, 0); // texture_width
        put_u16(result, 0); // texture_height
        put_u32(result, 0); // texture_data_offset
    }

    let areal_styles_offset = result.len();
    for object_class in &ArealObjectClass::ALL {
        match zoom_level_styles.areal_object_styles.get(object_class) {
            Some(style) => result.extend_from_slice(&style.color),
            None => result.extend_from_slice(&[128, 128, 128, 255]),
        }
    }

    let point_styles_order_offset = result.len();
    for object_class in &zoom_level_styles.point_classes_ordered {
        result.push(object_class.style_index());
    }

    let linear_styles_order_offset = result.len();
    for object_class in &zoom_level_styles.linear_classes_ordered {
        result.push(object_class.style_index());
    }

    let patch = |result: &mut Vec<u8>, field: usize, value: usize| {
        data_file::patch_u32(result, zoom_level_record_start + field, value as u32);
    };
    patch(result, zoom_level_offsets::POINT_STYLES_OFFSET, point_styles_offset);
    patch(result, zoom_level_offsets::POINT_STYLES_COUNT, PointObjectClass::ALL.len());
    patch(result, zoom_level_offsets::LINEAR_STYLES_OFFSET, linear_styles_offset);
    patch(result, zoom_level_offsets::LINEAR_STYLES_COUNT, LinearObjectClass::ALL.len());
    patch(result, zoom_level_offsets::AREAL_STYLES_OFFSET, areal_styles_offset);
    patch(result, zoom_level_offsets::AREAL_STYLES_COUNT, ArealObjectClass::ALL.len());
    patch(
        result,
        zoom_level_offsets::POINT_STYLES_ORDER_OFFSET,
        point_styles_order_offset,
    );
    patch(
        result,
        zoom_level_offsets::POINT_STYLES_ORDER_COUNT,
        zoom_level_styles.point_classes_ordered.len(),
    );
    patch(
        result,
        zoom_level_offsets::LINEAR_STYLES_ORDER_OFFSET,
        linear_styles_order_offset,
    );
    patch(
        result,
        zoom_level_offsets::LINEAR_STYLES_ORDER_COUNT,
        zoom_level_styles.linear_classes_ordered.len(),
    );
}

/// Serializes all zoom levels into one self-contained byte vector.
pub fn dump_data_file(prepared_data: &[ObjectsData], styles: &Styles) -> Vec<u8> {
    assert!(!prepared_data.is_empty());
    assert_eq!(prepared_data.len(), styles.zoom_levels.len());

    log::info!("Final export:");

    let front = &prepared_data[0];
    let mut result = Vec::new();

    result.extend_from_slice(MAGIC);
    put_u32(&mut result, VERSION);
    result.push(front.projection_kind as u8);
    put_f64(&mut result, front.geo_min.x);
    put_f64(&mut result, front.geo_min.y);
    put_f64(&mut result, front.geo_max.x);
    put_f64(&mut result, front.geo_max.y);
    put_i32(&mut result, front.min_point.x);
    put_i32(&mut result, front.min_point.y);
    put_i32(&mut result, front.max_point.x);
    put_i32(&mut result, front.max_point.y);
    put_i32(&mut result, front.coordinates_scale);
    put_u32(&mut result, 0); // zoom_levels_offset, patched below
    put_u32(&mut result, prepared_data.len() as u32);
    result.extend_from_slice(&styles.background_color);
    put_u32(&mut result, 0); // copyright_image_offset, patched below
    put_u16(&mut result, 0); // copyright_image_width
    put_u16(&mut result, 0); // copyright_image_height
    debug_assert_eq!(result.len(), HEADER_SIZE);

    let zoom_levels_offset = result.len();
    data_file::patch_u32(
        &mut result,
        header_offsets::ZOOM_LEVELS_OFFSET,
        zoom_levels_offset as u32,
    );
    result.resize(result.len() + prepared_data.len() * ZOOM_LEVEL_RECORD_SIZE, 0);

    for (zoom_level_index, zoom_level_data) in prepared_data.iter().enumerate() {
        log::info!("-- ZOOM LEVEL {} ---", zoom_level_index);

        let zoom_level_styles = &styles.zoom_levels[zoom_level_index];
        let zoom_level_record_start =
            zoom_levels_offset + zoom_level_index * ZOOM_LEVEL_RECORD_SIZE;

        // All zoom levels share the base projection bounds.
        debug_assert_eq!(zoom_level_data.min_point, front.min_point);

        let extent_x = (i64::from(zoom_level_data.max_point.x)
            - i64::from(zoom_level_data.min_point.x))
            / i64::from(zoom_level_data.coordinates_scale);
        let extent_y = (i64::from(zoom_level_data.max_point.y)
            - i64::from(zoom_level_data.min_point.y))
            / i64::from(zoom_level_data.coordinates_scale);
        let chunks_x = (extent_x + i64::from(MAX_CHUNK_SIZE) - 1) / i64::from(MAX_CHUNK_SIZE);
        let chunks_y = (extent_y + i64::from(MAX_CHUNK_SIZE) - 1) / i64::from(MAX_CHUNK_SIZE);

        let mut final_chunks_data = Vec::new();
        for x in 0..chunks_x as i32 {
            for y in 0..chunks_y as i32 {
                for chunk_data in dump_data_chunk(
                    zoom_level_data,
                    x * MAX_CHUNK_SIZE,
                    y * MAX_CHUNK_SIZE,
                    MAX_CHUNK_SIZE,
                ) {
                    if !chunk_data.is_empty() {
                        final_chunks_data.push(chunk_data);
                    }
                }
            }
        }

        let chunks_description_offset = result.len();
        data_file::patch_u32(
            &mut result,
            zoom_level_record_start + zoom_level_offsets::CHUNKS_DESCRIPTION_OFFSET,
            chunks_description_offset as u32,
        );
        data_file::patch_u32(
            &mut result,
            zoom_level_record_start + zoom_level_offsets::CHUNK_COUNT,
            final_chunks_data.len() as u32,
        );
        result.resize(result.len() + final_chunks_data.len() * CHUNK_DESCRIPTION_SIZE, 0);

        let mut chunks_data_size = 0usize;
        for (i, chunk_data) in final_chunks_data.iter().enumerate() {
            chunks_data_size += chunk_data.len();
            let description_offset = chunks_description_offset + i * CHUNK_DESCRIPTION_SIZE;
            let result_len = result.len();
            data_file::patch_u32(&mut result, description_offset, result_len as u32);
            data_file::patch_u32(&mut result, description_offset + 4, chunk_data.len() as u32);
            result.extend_from_slice(chunk_data);
        }
        log::info!(
            "{} chunks, {} bytes ({}kb)",
            final_chunks_data.len(),
            chunks_data_size,
            chunks_data_size / 1024
        );

        dump_zoom_level_styles(
            &mut result,
            zoom_level_record_start,
            zoom_level_styles,
            zoom_level_data.meters_in_unit.max(f32::MIN_POSITIVE),
        );
        data_file::patch_f32(
            &mut result,
            zoom_level_record_start + zoom_level_offsets::UNIT_SIZE_M,
            zoom_level_data.meters_in_unit,
        );
        data_file::patch_u32(
            &mut result,
            zoom_level_record_start + zoom_level_offsets::ZOOM_LEVEL_LOG2,
            zoom_level_data.zoom_level_log2,
        );
    }

    // Copyright raster decoding is platform glue; the slot stays empty.
    let copyright_image_offset = result.len();
    data_file::patch_u32(
        &mut result,
        header_offsets::COPYRIGHT_IMAGE_OFFSET,
        copyright_image_offset as u32,
    );

    log::info!("result size is {} bytes ({}kb)", result.len(), result.len() / 1024);

    result
}

pub fn write_map_file(
    prepared_data: &[ObjectsData],
    styles: &Styles,
    file_name: &Path,
) -> Result<(), ExportError> {
    let content = dump_data_file(prepared_data, styles);
    fs::write(file_name, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{ByteOrder, LittleEndian};
    use projection_transform::ProjectionKind;
    use vmap_core::ir::LinearObject;
    use vmap_core::styles::parse_styles;
    use vmap_core::ZERO_Z_LEVEL;

    fn read_u16(data: &[u8], offset: usize) -> u16 {
        LittleEndian::read_u16(&data[offset..offset + 2])
    }

    fn read_u32(data: &[u8], offset: usize) -> u32 {
        LittleEndian::read_u32(&data[offset..offset + 4])
    }

    fn empty_styles(zoom_levels: usize) -> Styles {
        let mut text = String::from(r#"{ "zoom_levels": ["#);
        for i in 0..zoom_levels {
            if i > 0 {
                text.push(',');
            }
            text.push_str(&format!(r#"{{ "scale_log2": {} }}"#, i));
        }
        text.push_str("] }");
        parse_styles(&text).unwrap()
    }

    #[test]
    fn empty_input_still_yields_all_zoom_levels() {
        let levels = vec![
            ObjectsData::empty(ProjectionKind::Albers, 0),
            ObjectsData::empty(ProjectionKind::Albers, 1),
        ];
        let file = dump_data_file(&levels, &empty_styles(2));

        assert_eq!(&file[..16], MAGIC);
        assert_eq!(read_u32(&file, header_offsets::VERSION), VERSION);
        assert_eq!(file[header_offsets::PROJECTION], ProjectionKind::Albers as u8);
        assert_eq!(read_u32(&file, header_offsets::ZOOM_LEVEL_COUNT), 2);

        let zoom_levels_offset = read_u32(&file, header_offsets::ZOOM_LEVELS_OFFSET) as usize;
        assert_eq!(zoom_levels_offset, HEADER_SIZE);
        for index in 0..2 {
            let record = zoom_levels_offset + index * ZOOM_LEVEL_RECORD_SIZE;
            assert_eq!(read_u32(&file, record + zoom_level_offsets::CHUNK_COUNT), 0);
            assert_eq!(
                read_u32(&file, record + zoom_level_offsets::ZOOM_LEVEL_LOG2),
                index as u32
            );
            assert_eq!(
                read_u32(&file, record + zoom_level_offsets::LINEAR_STYLES_COUNT),
                LinearObjectClass::ALL.len() as u32
            );
        }
    }

    #[test]
    fn single_segment_produces_one_chunk_with_road_group() {
        let mut data = ObjectsData::empty(ProjectionKind::Albers, 0);
        data.max_point = projection_transform::ProjectionPoint { x: 1000, y: 1000 };
        data.linear_objects_vertices.extend_from_slice(&[
            projection_transform::ProjectionPoint { x: 100, y: 100 },
            projection_transform::ProjectionPoint { x: 500, y: 100 },
        ]);
        data.linear_objects.push(LinearObject {
            class: vmap_core::classes::LinearObjectClass::Road,
            z_level: ZERO_Z_LEVEL,
            first_vertex_index: 0,
            vertex_count: 2,
        });

        let file = dump_data_file(&[data], &empty_styles(1));

        let zoom_levels_offset = read_u32(&file, header_offsets::ZOOM_LEVELS_OFFSET) as usize;
        assert_eq!(read_u32(&file, zoom_levels_offset + zoom_level_offsets::CHUNK_COUNT), 1);

        let descriptions_offset = read_u32(
            &file,
            zoom_levels_offset + zoom_level_offsets::CHUNKS_DESCRIPTION_OFFSET,
        ) as usize;
        let chunk_offset = read_u32(&file, descriptions_offset) as usize;
        let chunk_size = read_u32(&file, descriptions_offset + 4) as usize;
        let chunk = &file[chunk_offset..chunk_offset + chunk_size];

        use vmap_core::data_file::chunk_offsets;
        assert_eq!(read_u16(chunk, chunk_offsets::LINEAR_OBJECT_GROUPS_COUNT), 1);
        assert_eq!(read_u16(chunk, chunk_offsets::VERTEX_COUNT), 3);
    }

    #[test]
    fn style_orders_are_written_as_class_indices() {
        let styles = parse_styles(
            r##"{
                "linear_classes_ordered": ["Waterway", "Road"],
                "zoom_levels": [{ "scale_log2": 0 }]
            }"##,
        )
        .unwrap();
        let levels = vec![ObjectsData::empty(ProjectionKind::Albers, 0)];
        let file = dump_data_file(&levels, &styles);

        let zoom_levels_offset = read_u32(&file, header_offsets::ZOOM_LEVELS_OFFSET) as usize;
        let order_offset = read_u32(
            &file,
            zoom_levels_offset + zoom_level_offsets::LINEAR_STYLES_ORDER_OFFSET,
        ) as usize;
        let order_count = read_u32(
            &file,
            zoom_levels_offset + zoom_level_offsets::LINEAR_STYLES_ORDER_COUNT,
        ) as usize;

        assert_eq!(order_count, 2);
        assert_eq!(
            &file[order_offset..order_offset + 2],
            &[
                LinearObjectClass::Waterway.style_index(),
                LinearObjectClass::Road.style_index()
            ]
        );
    }

    #[test]
    fn background_color_lands_in_the_header() {
        let styles = parse_styles(r##"{ "background_color": "#102030" }"##).unwrap();
        let levels = vec![ObjectsData::empty(ProjectionKind::Mercator, 0)];
        let file = dump_data_file(&levels, &styles);
        assert_eq!(
            &file[header_offsets::BACKGROUND_COLOR..header_offsets::BACKGROUND_COLOR + 4],
            &[0x10, 0x20, 0x30, 0xFF]
        );
        assert_eq!(file[header_offsets::PROJECTION], 0);
    }
}
