use crate::docx::package::escape_xml;
use crate::docx::{DML_NS, PIC_NS, REL_NS, WML_NS, WPD_NS};
use crate::model::Alignment;

pub(crate) const EMU_PER_INCH: f64 = 914_400.0;

/// Display size in EMU for a picture scaled to `width_inches`, keeping the
/// pixel aspect ratio.
pub(crate) fn extent_emu(width_inches: f32, pixel_width: u32, pixel_height: u32) -> (u64, u64) {
    let cx = (width_inches as f64 * EMU_PER_INCH).round() as u64;
    let cy = (cx as f64 * pixel_height as f64 / pixel_width.max(1) as f64).round() as u64;
    (cx, cy)
}

pub(crate) struct InlinePicture<'a> {
    pub(crate) rel_id: &'a str,
    pub(crate) drawing_id: u32,
    pub(crate) file_name: &'a str,
    pub(crate) cx: u64,
    pub(crate) cy: u64,
}

/// A standalone `w:p` holding one inline picture. Every namespace it uses is
/// declared on the element itself so it can be dropped into any body.
pub(crate) fn image_paragraph_xml(pic: &InlinePicture, alignment: Alignment) -> String {
    let InlinePicture {
        rel_id,
        drawing_id,
        file_name,
        cx,
        cy,
    } = *pic;
    let rel_id = escape_xml(rel_id);
    let file_name = escape_xml(file_name);
    let jc = alignment.wml_val();
    format!(
        concat!(
            r#"<w:p xmlns:w="{w}" xmlns:r="{r}"><w:pPr><w:jc w:val="{jc}"/></w:pPr><w:r><w:drawing>"#,
            r#"<wp:inline xmlns:wp="{wp}" distT="0" distB="0" distL="0" distR="0">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/>"#,
            r#"<wp:docPr id="{id}" name="Picture {id}"/>"#,
            r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="{a}" noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
            r#"<a:graphic xmlns:a="{a}"><a:graphicData uri="{pic}"><pic:pic xmlns:pic="{pic}">"#,
            r#"<pic:nvPicPr><pic:cNvPr id="0" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip r:embed="{rid}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
            r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#,
        ),
        w = WML_NS,
        r = REL_NS,
        wp = WPD_NS,
        a = DML_NS,
        pic = PIC_NS,
        jc = jc,
        cx = cx,
        cy = cy,
        id = drawing_id,
        name = file_name,
        rid = rel_id,
    )
}
