use crate::conversion::types::GPX_POINT_SPACING_SECS;

/// Upload page: drop a TCX or GPX file and receive the FIT course back.
pub fn render_landing_page() -> String {
    LANDING_PAGE.replace("{{gpx_spacing}}", &GPX_POINT_SPACING_SECS.to_string())
}

/// Plain-text body for a failed conversion.
pub fn render_conversion_error(message: &str) -> String {
    format!("Conversion failed: {message}")
}

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>CourseFit</title>
  <style>
    body { font-family: Arial, sans-serif; margin: 0; padding: 0; background: #f7f7f7; }
    header { background: #20232a; color: white; padding: 1rem 2rem; }
    main { padding: 2rem; max-width: 960px; margin: 0 auto; }
    .drop-zone { border: 2px dashed #888; padding: 2rem; background: white; text-align: center; }
    .drop-zone.drag { border-color: #2563eb; background: #eff6ff; }
    .status { margin-top: 1rem; }
    label { display: block; margin-top: 1rem; }
    button { background: #2563eb; color: white; border: none; padding: 0.75rem 1.5rem; border-radius: 4px; cursor: pointer; }
    button:hover { background: #1d4ed8; }
  </style>
</head>
<body>
  <header><h1>CourseFit</h1></header>
  <main>
    <p>Convert a TCX or GPX track into a FIT course for your GPS device.</p>
    <div id="drop-zone" class="drop-zone">
      <p>Drag &amp; drop a .tcx or .gpx file here, or click to select.</p>
      <input id="file-input" type="file" accept=".tcx,.gpx" style="display:none" />
      <button id="select-btn" type="button">Choose a file</button>
    </div>
    <label>Seconds between GPX points without timestamps
      <input id="gpx-spacing" type="number" min="1" value="{{gpx_spacing}}" />
    </label>
    <p class="status" id="status"></p>
  </main>
  <script>
    const dropZone = document.getElementById('drop-zone');
    const fileInput = document.getElementById('file-input');
    const selectBtn = document.getElementById('select-btn');
    const spacingInput = document.getElementById('gpx-spacing');
    const statusEl = document.getElementById('status');

    const preventDefaults = (e) => { e.preventDefault(); e.stopPropagation(); };
    ['dragenter', 'dragover', 'dragleave', 'drop'].forEach(eventName => {
      dropZone.addEventListener(eventName, preventDefaults, false);
      document.body.addEventListener(eventName, preventDefaults, false);
    });
    ['dragenter', 'dragover'].forEach(eventName => {
      dropZone.addEventListener(eventName, () => dropZone.classList.add('drag'), false);
    });
    ['dragleave', 'drop'].forEach(eventName => {
      dropZone.addEventListener(eventName, () => dropZone.classList.remove('drag'), false);
    });

    dropZone.addEventListener('click', () => fileInput.click());
    selectBtn.addEventListener('click', (e) => { e.stopPropagation(); fileInput.click(); });
    dropZone.addEventListener('drop', handleFiles);
    fileInput.addEventListener('change', (e) => handleFiles({ dataTransfer: { files: e.target.files } }));

    async function handleFiles(e) {
      const files = e.dataTransfer.files;
      if (!files || files.length === 0) {
        return;
      }
      const formData = new FormData();
      formData.append('file', files[0]);
      formData.append('gpx_spacing', spacingInput.value);
      statusEl.textContent = 'Converting...';
      try {
        const response = await fetch('/convert', { method: 'POST', body: formData });
        if (!response.ok) {
          statusEl.textContent = await response.text();
          return;
        }
        const disposition = response.headers.get('content-disposition') || '';
        const match = disposition.match(/filename="([^"]+)"/);
        const blob = await response.blob();
        const link = document.createElement('a');
        link.href = URL.createObjectURL(blob);
        link.download = match ? match[1] : 'course.fit';
        link.click();
        URL.revokeObjectURL(link.href);
        statusEl.textContent = 'Downloaded ' + link.download;
      } catch (err) {
        statusEl.textContent = 'Upload failed: ' + err;
      }
    }
  </script>
</body>
</html>"#;
